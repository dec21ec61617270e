fn main() {
    multiview_pipeline::cli::run();
}
