use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = native_fingerprint::app::run() {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}
