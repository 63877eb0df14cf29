use clap::Parser;
use panprimer::args::{Args, Parameters};
use panprimer::pipeline;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::process;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

fn main() {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("logger initialization");

    let args = Args::parse();
    let params = match Parameters::from_args(args) {
        Ok(params) => params,
        Err(e) => {
            log::error!("invalid arguments: {e}");
            process::exit(1);
        }
    };

    let threads = if params.num_threads == 0 {
        num_cpus::get()
    } else {
        params.num_threads
    };
    if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
        log::error!("could not configure {threads} worker threads: {e}");
        process::exit(1);
    }

    if let Err(e) = pipeline::run(&params) {
        log::error!("{e:#}");
        process::exit(1);
    }
}
