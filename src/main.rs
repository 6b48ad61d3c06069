fn main() {
    std::process::exit(benchtrack::run());
}
