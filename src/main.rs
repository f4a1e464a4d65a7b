fn main() {
    if let Err(err) = squad_reconcile::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
