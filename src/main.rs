use hvl_dataflow::projects::cli::start_cli;

fn main() {
    start_cli();
}
