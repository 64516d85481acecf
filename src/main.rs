//! keymixer: encrypt resources with large mixed keys.
//!
//! ```text
//! keymixer [--output PATH] [--iv HEX32] [--primitive NAME] [--threads N] [--verbose] KEYFILE [INPUT]
//! ```
//!
//! Reads the resource from `INPUT` (standard input when omitted), encrypts
//! it under the key file and writes the result to `--output` (standard
//! output when omitted). Running the same command on the ciphertext
//! decrypts it.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use keymixer::{stream, Ctx, Error, Fanout, MixType};

// Exit codes, distinguishable by scripts.
const EXIT_USAGE: u8 = 2;
const EXIT_ENC: u8 = 100;
const EXIT_KEY_SIZE: u8 = 101;
const EXIT_KEY_READ: u8 = 102;
const EXIT_IO: u8 = 103;

#[derive(Parser)]
#[command(name = "keymixer")]
#[command(version)]
#[command(about = "Encrypt resources using large mixed keys")]
struct Cli {
    /// Output to file instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 16-byte initialization vector as 32 hex characters (default: all zero)
    #[arg(short, long)]
    iv: Option<String>,

    /// One of the available mixing primitives
    #[arg(short, long, default_value = "xkcp-turboshake128")]
    primitive: String,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// The key file
    key: PathBuf,

    /// Input file (standard input when omitted)
    input: Option<PathBuf>,
}

struct Failure {
    code: u8,
    message: String,
}

impl Failure {
    fn new(code: u8, message: impl ToString) -> Failure {
        Failure { code, message: message.to_string() }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("keymixer: {}", failure.message);
            ExitCode::from(failure.code)
        }
    }
}

fn run(cli: &Cli) -> Result<(), Failure> {
    let primitive =
        MixType::from_name(&cli.primitive).map_err(|err| Failure::new(EXIT_USAGE, err))?;
    let iv = parse_iv(cli.iv.as_deref())?;
    let threads = cli.threads.unwrap_or_else(num_cpus::get).max(1);

    // The largest fanout that divides the primitive's block.
    let fanout = Fanout::for_block_size(primitive.block_size())
        .next()
        .ok_or_else(|| Failure::new(EXIT_USAGE, "no legal fanout for this primitive"))?;

    if cli.verbose {
        eprintln!("===============");
        eprintln!("KEYMIXER CONFIG");
        eprintln!("===============");
        eprintln!("resource:  {}", display_path(cli.input.as_ref()));
        eprintln!("output:    {}", display_path(cli.output.as_ref()));
        eprintln!("key:       {}", cli.key.display());
        eprintln!("iv:        [redacted]");
        eprintln!("primitive: {}", primitive.name());
        eprintln!("fanout:    {}", fanout.as_usize());
        eprintln!("threads:   {threads}");
        eprintln!("===============");
    }

    let key = stream::load_key(&cli.key)
        .map_err(|err| Failure::new(EXIT_KEY_READ, format!("cannot read key: {err}")))?;

    let ctx = Ctx::encryption(primitive, &key, fanout, iv)
        .map_err(|err| Failure::new(EXIT_KEY_SIZE, err))?;

    let mut input: Box<dyn Read> = match &cli.input {
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| Failure::new(EXIT_IO, format!("{}: {err}", path.display())))?,
        ),
        None => Box::new(io::stdin().lock()),
    };
    let mut output: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .map_err(|err| Failure::new(EXIT_IO, format!("{}: {err}", path.display())))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    stream::stream_encrypt(&ctx, &mut input, &mut output, threads, 1).map_err(|err| match err {
        Error::Io(err) => Failure::new(EXIT_IO, err),
        other => Failure::new(EXIT_ENC, other),
    })?;
    output.flush().map_err(|err| Failure::new(EXIT_IO, err))?;

    Ok(())
}

fn parse_iv(arg: Option<&str>) -> Result<[u8; 16], Failure> {
    let Some(hex_iv) = arg else {
        return Ok([0u8; 16]);
    };
    if hex_iv.len() != 32 {
        return Err(Failure::new(EXIT_USAGE, "IV must be exactly 32 hex characters"));
    }
    let bytes = hex::decode(hex_iv)
        .map_err(|_| Failure::new(EXIT_USAGE, "IV must consist of valid hex characters"))?;
    let mut iv = [0u8; 16];
    iv.copy_from_slice(&bytes);
    Ok(iv)
}

fn display_path(path: Option<&PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "-".to_string(),
    }
}
