use std::env;
use std::io::Write;

use vidpull_core::fsutil;
use vidpull_core::progress::{format_bytes, ProgressObserver, ProgressSnapshot};
use vidpull_core::{TransferConfig, TransferEngine, TransferTask};

struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn update(&self, label: &str, snapshot: &ProgressSnapshot) {
        let total = match snapshot.total {
            Some(total) => format_bytes(total),
            None => "?".to_string(),
        };
        eprint!(
            "\r{} [{}] {} {}/{} ({}/s) eta {}   ",
            label,
            snapshot.bar(30),
            snapshot.percent(),
            format_bytes(snapshot.transferred),
            total,
            format_bytes(snapshot.speed_bps),
            snapshot.eta(),
        );
        let _ = std::io::stderr().flush();
    }

    fn finish(&self, label: &str, snapshot: &ProgressSnapshot) {
        eprintln!(
            "\r{} [{}] {} {}                    ",
            label,
            snapshot.bar(30),
            snapshot.percent(),
            format_bytes(snapshot.transferred),
        );
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut urls: Vec<String> = Vec::new();
    let mut out = String::new();
    let mut retries = 3u32;
    let mut sample: Option<u64> = None;
    let mut referer: Option<String> = None;
    let mut label: Option<String> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" | "--out" => match iter.next() {
                Some(value) => out = value.clone(),
                None => return print_usage_and_exit(),
            },
            "--retries" => match iter.next().and_then(|value| value.parse().ok()) {
                Some(value) => retries = value,
                None => return print_usage_and_exit(),
            },
            "--sample" => match iter.next().and_then(|value| value.parse().ok()) {
                Some(value) => sample = Some(value),
                None => return print_usage_and_exit(),
            },
            "--referer" => match iter.next() {
                Some(value) => referer = Some(value.clone()),
                None => return print_usage_and_exit(),
            },
            "--label" => match iter.next() {
                Some(value) => label = Some(value.clone()),
                None => return print_usage_and_exit(),
            },
            "-h" | "--help" => return print_usage_and_exit(),
            other if other.starts_with('-') => {
                eprintln!("unknown option: {}", other);
                return print_usage_and_exit();
            }
            url => urls.push(url.to_string()),
        }
    }

    if urls.is_empty() {
        return print_usage_and_exit();
    }

    let engine = match TransferEngine::new(TransferConfig::default()) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    };

    let observer = ConsoleProgress;
    let mut failures = 0usize;
    for url in &urls {
        let dest = fsutil::resolve_dest_path(&out, url);
        let mut task = TransferTask::new(url.as_str(), dest)
            .with_referer(referer.clone())
            .with_max_retries(retries)
            .with_sample_cap(sample);
        if let Some(label) = &label {
            task = task.with_label(label.clone());
        }
        match engine.run(&task, &observer) {
            Ok(status) => {
                log::info!("{}: {}", task.label, status);
                println!("{}: {}", task.label, status);
            }
            Err(err) => {
                // One failed task does not abort the rest; its temp file
                // stays behind for the next invocation.
                log::error!("{}: {}", task.label, err);
                eprintln!("error: {}: {}", task.label, err);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}

fn print_usage_and_exit() {
    eprintln!(
        "Usage: vidpull [options] <url>...\n\
Options:\n\
  -o, --out <path>     Destination file or directory (default: current dir)\n\
  --retries <n>        Attempts per transfer (default 3)\n\
  --sample <bytes>     Fetch only the first <bytes> bytes, to <name>.sample\n\
  --referer <url>      Referer header to send with every request\n\
  --label <text>       Display label for progress lines\n\
Environment:\n\
  RUST_LOG=debug       Verbose engine logging"
    );
    std::process::exit(2);
}
