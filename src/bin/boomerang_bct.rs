use boomerang_search::bct::{ConnectivityTable, check_switch};
use boomerang_search::characteristic::Difference;
use boomerang_search::cipher::Paradigm;
use boomerang_search::log_probability;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "boomerang_bct")]
#[command(about = "Print the Feistel boomerang connectivity table of an S-box")]
struct Args {
    /// S-box as comma-separated hex values (e.g. c,a,d,3,e,b,f,7,8,9,1,5,0,2,4,6)
    #[arg(long, value_delimiter = ',', value_parser = parse_nibble, require_equals = true)]
    sbox: Vec<u8>,

    /// Structure of the cipher
    #[arg(long, default_value = "gfn", require_equals = true)]
    paradigm: ParadigmArg,

    /// Output difference of the upper trail (e.g. 0x0010)
    #[arg(long, value_parser = parse_difference, requires = "gamma", require_equals = true)]
    beta: Option<Difference>,

    /// Input difference of the lower trail (e.g. 0x0001)
    #[arg(long, value_parser = parse_difference, requires = "beta", require_equals = true)]
    gamma: Option<Difference>,

    /// Nibble permutation of the round function as comma-separated indices
    #[arg(long, value_delimiter = ',', require_equals = true)]
    perm: Vec<usize>,

    /// Width of the cipher state in bits (defaults to one S-box per permutation entry)
    #[arg(long, require_equals = true)]
    word_size: Option<usize>,

    /// Logging verbosity (use -v for info, or -v=LEVEL for specific level)
    #[arg(long, short = 'v', value_name = "LEVEL", num_args = 0..=1, default_missing_value = "info", require_equals = true)]
    verbose: Option<Option<LogLevel>>,
}

#[derive(Clone, clap::ValueEnum)]
enum ParadigmArg {
    Gfn,
    Feistel,
}

impl From<ParadigmArg> for Paradigm {
    fn from(value: ParadigmArg) -> Self {
        match value {
            ParadigmArg::Gfn => Paradigm::GeneralizedFeistel,
            ParadigmArg::Feistel => Paradigm::Feistel,
        }
    }
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
        }
    }
}

fn parse_nibble(value: &str) -> Result<u8, String> {
    let digits = value.trim().trim_start_matches("0x");
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid S-box entry `{value}`: {e}"))
}

fn parse_difference(value: &str) -> Result<Difference, String> {
    Difference::parse(value).map_err(|e| e.to_string())
}

fn main() {
    let args = Args::parse();

    let log_level = match args.verbose {
        None => LevelFilter::Off,
        Some(None) => LevelFilter::Info,
        Some(Some(level)) => level.into(),
    };
    Builder::from_default_env().filter_level(log_level).init();

    if !args.sbox.len().is_power_of_two() || args.sbox.len() < 2 {
        eprintln!(
            "S-box must have a power of two entries, got {}.",
            args.sbox.len()
        );
        std::process::exit(1);
    }
    let bits = args.sbox.len().trailing_zeros() as usize;
    let paradigm: Paradigm = args.paradigm.into();

    let table = ConnectivityTable::build(&args.sbox, bits, paradigm).unwrap_or_else(|e| {
        eprintln!("Failed to build connectivity table: {e}");
        std::process::exit(1);
    });
    println!("{table}");
    println!(
        "Entries with full connectivity: {} of {}.",
        table.full_count(),
        table.size() * table.size()
    );

    let (Some(beta), Some(gamma)) = (args.beta, args.gamma) else {
        return;
    };
    if args.perm.is_empty() {
        eprintln!("Checking a switch requires --perm.");
        std::process::exit(1);
    }
    let word_size = args.word_size.unwrap_or(args.perm.len() * bits);
    let switch = check_switch(beta, gamma, &table, &args.perm, paradigm, word_size);
    if switch.is_accepted() {
        println!(
            "Switch {} -> {}: probability {}.",
            beta.to_hex(word_size),
            gamma.to_hex(word_size),
            log_probability(switch.probability())
        );
    } else {
        println!(
            "Switch {} -> {}: invalid.",
            beta.to_hex(word_size),
            gamma.to_hex(word_size)
        );
    }
}
