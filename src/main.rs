fn main() {
    if let Err(err) = trace_chart::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
