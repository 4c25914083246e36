//! Download a URL with a progress bar
//!
//! ```text
//! progressed <url> [-o FILE] [--overwrite] [--head] [--quiet] [--post DATA]
//! ```
//!
//! Without `-o` the body is printed to stdout after the transfer.

use progressed_http::http::{self, ReadState, RequestOptions};
use std::io::Write;
use std::process::ExitCode;

const USAGE: &str = "usage: progressed <url> [-o FILE] [--overwrite] [--head] [--quiet] [--post DATA]";

struct Args {
    url: String,
    output: Option<String>,
    overwrite: bool,
    head: bool,
    quiet: bool,
    post: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut url = None;
    let mut parsed = Args {
        url: String::new(),
        output: None,
        overwrite: false,
        head: false,
        quiet: false,
        post: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => {
                parsed.output = Some(args.next().ok_or("-o needs a file name")?);
            }
            "--post" => {
                parsed.post = Some(args.next().ok_or("--post needs data")?);
            }
            "--overwrite" => parsed.overwrite = true,
            "--head" => parsed.head = true,
            "-q" | "--quiet" => parsed.quiet = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            s if s.starts_with('-') => return Err(format!("unknown option `{}`\n{}", s, USAGE)),
            _ if url.is_some() => return Err(USAGE.to_string()),
            _ => url = Some(arg),
        }
    }

    parsed.url = url.ok_or_else(|| USAGE.to_string())?;
    Ok(parsed)
}

fn run(args: Args) -> http::Result<()> {
    let mut options = RequestOptions::new()
        .skip_body(args.head)
        .progress(!args.quiet)
        .overwrite(args.overwrite);
    if let Some(path) = &args.output {
        options = options.destination(path);
    }

    let reader = match args.post {
        Some(data) => http::post(&args.url, options.data(data.as_str()))?,
        None => http::get(&args.url, options)?,
    };

    if let Some(status) = reader.status() {
        eprintln!("{}", status);
    }
    if args.head {
        eprintln!("{}", reader.headers());
    }
    reader.error_for_outcome()?;

    if let Some(path) = reader.file_path() {
        eprintln!("saved to {}", path.display());
    } else if let (ReadState::Done(_), Some(body)) = (reader.state(), reader.body()) {
        std::io::stdout().write_all(body)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("progressed: {}", e);
            ExitCode::FAILURE
        }
    }
}
