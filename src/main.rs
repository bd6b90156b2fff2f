fn main() -> Result<(), Box<dyn std::error::Error>> {
    promptstream::cli::main()
}
