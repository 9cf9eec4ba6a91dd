mod cli;

#[tokio::main]
async fn main() {
    let (addr, config) = match cli::run() {
        cli::RunOutcome::Serve(addr, config) => (addr, config),
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    };

    println!("listening on http://{addr}");
    stillbell::serve(addr, config).await;
}
