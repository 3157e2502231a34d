fn main() {
    imagegraph::cli::run();
}
