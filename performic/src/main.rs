fn main() {
    if let Err(e) = performic::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(2);
    }
}
