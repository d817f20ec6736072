fn main() {
    if let Err(error) = cubeworld::run() {
        eprintln!("cubeworld failed to start: {error}");
        std::process::exit(1);
    }
}
