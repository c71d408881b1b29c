use clap::Parser;
use log::info;
use rcon::RconClient;

#[derive(Parser, Debug)]
#[command(author, version, about = "Send a single command to a Source RCON server", long_about = None)]
struct Args {
    /// Server host name or IP address
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// RCON port
    #[arg(short, long, default_value = "27015")]
    port: u16,

    /// RCON password
    #[arg(short = 'P', long, env = "RCON_PASSWORD", default_value = "")]
    password: String,

    /// Command to execute, e.g. `status`
    #[arg(required = true, trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let endpoint = format!("{}:{}", args.host, args.port);
    let command = args.command.join(" ");

    info!("Connecting to {}", endpoint);
    let mut client = RconClient::connect(&endpoint, &args.password).await?;

    let response = client.execute(&command).await?;
    print!("{}", response);
    if !response.ends_with('\n') {
        println!();
    }

    Ok(())
}
