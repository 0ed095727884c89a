#[tokio::main]
async fn main() {
  if let Err(e) = coach_desk_lib::run().await {
    eprintln!("coach-desk failed to start: {}", e);
    std::process::exit(1);
  }
}
