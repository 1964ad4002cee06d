fn main() {
    if let Err(err) = review_agreement::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
