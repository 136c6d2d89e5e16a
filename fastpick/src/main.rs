use fastpick::{ProtocolLine, ProtocolSink, StreamSink};
use std::process::ExitCode;

fn main() -> ExitCode {
    match fastpick::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Fatal errors are part of the output protocol
            let _ = StreamSink::stdio().emit(&ProtocolLine::Fatal(format!("{e:#}")));
            ExitCode::FAILURE
        }
    }
}
