//! rtacl: benchmark the ACL index and inspect rule files.

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rtacl::config::{parse_proto_range, FieldSpec};
use rtacl::workload::Workload;
use rtacl::{encode, Acl, AclConfig, AddressFamily, Family, FieldSet, Prof, RuleId, V4, V6};
use std::net::IpAddr;
use std::path::PathBuf;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "rtacl")]
#[command(version = "0.1.0")]
#[command(about = "R-tree ACL classifier: benchmark and rule file tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert, match, unmatch and remove a synthetic rule set, printing latency histograms
    Bench {
        /// Number of rules
        #[arg(short, long, default_value_t = 1_000_000)]
        rules: u32,

        /// Seed for the random lookups (random if omitted)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Use IPv6 rules
        #[arg(long)]
        v6: bool,
    },

    /// Load a rule file and print the stored ranges
    Check {
        /// Rule file (.yaml, .yml or .json)
        input: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the rules of a rule file matching one flow
    Classify {
        /// Rule file (.yaml, .yml or .json)
        input: PathBuf,

        /// Source address
        #[arg(long)]
        src: IpAddr,

        /// Destination address
        #[arg(long)]
        dst: IpAddr,

        /// Source port
        #[arg(long, default_value_t = 0)]
        sport: u16,

        /// Destination port
        #[arg(long, default_value_t = 0)]
        dport: u16,

        /// Protocol name or number
        #[arg(long, default_value = "tcp")]
        proto: String,

        /// DSCP value
        #[arg(long, default_value_t = 0)]
        dscp: u8,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Bench { rules, seed, v6 } => {
            let seed = seed.unwrap_or_else(rand::random);
            if v6 {
                Workload::v6(rules).map_err(Into::into).and_then(|w| bench(&w, seed))
            } else {
                Workload::v4(rules).map_err(Into::into).and_then(|w| bench(&w, seed))
            }
        }
        Commands::Check { input, verbose } => check_file(&input, verbose),
        Commands::Classify {
            input,
            src,
            dst,
            sport,
            dport,
            proto,
            dscp,
        } => classify_file(&input, src, dst, sport, dport, &proto, dscp),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn bench<F: AddressFamily>(workload: &Workload<F>, seed: u64) -> CliResult<()> {
    let n = workload.len();
    let mut profs = ["insert: ", "match: ", "unmatch: ", "remove: "].map(Prof::new);
    for prof in &mut profs {
        prof.run();
    }
    let [insert, matched, unmatched, remove] = &mut profs;
    let mut errors = 0u32;

    log::info!("Inserting {} {} rules", n, F::NAME);
    let mut acl: Acl<F, u32> = Acl::new();
    let mut ids: Vec<RuleId> = Vec::with_capacity(n as usize);
    for rule in workload.rules() {
        insert.begin();
        let id = acl.add_rule(rule)?;
        insert.end();
        ids.push(id);
    }
    println!("size: {}, rules: {}, depth: {}", acl.len(), n, acl.index().depth());
    if acl.len() != n as usize {
        return Err(format!("size mismatch: {} != {}", acl.len(), n).into());
    }
    println!("{}", insert.report());

    if n > 0 {
        println!("seed: {}", seed);
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..n {
            let k = rng.random_range(0..n);
            let key = encode::make_key(&workload.inside(k));
            matched.begin();
            let hits = acl.index().query(&key);
            matched.end();
            if hits.len() != 1 || hits[0].handle != ids[k as usize] {
                errors += 1;
                eprintln!("Error: no match: key: {}", encode::format_tuple::<F>(&key));
            }
        }
        println!("Random match test:\n{}", matched.report());

        for _ in 0..n {
            let k = rng.random_range(0..n);
            let key = encode::make_key(&workload.outside(k));
            unmatched.begin();
            let hits = acl.index().query(&key);
            unmatched.end();
            if !hits.is_empty() {
                errors += 1;
                eprintln!("Error: matched: key: {}", encode::format_tuple::<F>(&key));
                for hit in hits {
                    eprintln!("  rtree: {}", encode::format_range::<F>(&hit.range));
                }
            }
        }
        println!("Random unmatch test:\n{}", unmatched.report());
    }

    log::info!("Removing {} rules", n);
    for (i, id) in ids.into_iter().enumerate() {
        remove.begin();
        let removed = acl.remove_rule(id);
        remove.end();
        match removed {
            Some(rule) => {
                if !acl.classify(&workload.inside(i as u32)).is_empty() {
                    errors += 1;
                    eprintln!("Error: matched after remove: {}", rule);
                }
            }
            None => {
                errors += 1;
                eprintln!("Error: failed to remove rule {}", id);
            }
        }
    }
    println!("{}", remove.report());

    if errors > 0 {
        return Err(format!("{} verification errors", errors).into());
    }
    Ok(())
}

fn check_file(input: &PathBuf, verbose: bool) -> CliResult<()> {
    let config = AclConfig::from_path(input)?;
    match config.family {
        Family::Ipv4 => check::<V4>(&config, verbose),
        Family::Ipv6 => check::<V6>(&config, verbose),
    }
}

fn check<F: AddressFamily>(config: &AclConfig, verbose: bool) -> CliResult<()> {
    let acl = Acl::<F, String>::from_config(config)?;
    let mut entries = acl.index().dump();
    entries.sort_by_key(|e| e.handle);
    for entry in entries {
        let name = acl.rule(entry.handle).map(|r| r.payload().as_str()).unwrap_or("?");
        println!("{:<16} {}", name, encode::format_range::<F>(&entry.range));
    }
    if verbose {
        println!("{}", "-".repeat(60));
        println!("Family:   {}", config.family);
        println!("Rules:    {}", acl.len());
        println!("Depth:    {}", acl.index().depth());
        println!("Fan-out:  {:?}", acl.index().params());
    }
    Ok(())
}

fn classify_file(
    input: &PathBuf,
    src: IpAddr,
    dst: IpAddr,
    sport: u16,
    dport: u16,
    proto: &str,
    dscp: u8,
) -> CliResult<()> {
    let (proto, hi) = parse_proto_range(Some(&FieldSpec::from(proto)))?;
    if proto != hi {
        return Err(format!("protocol must be a single value, got {}-{}", proto, hi).into());
    }
    let config = AclConfig::from_path(input)?;
    match config.family {
        Family::Ipv4 => classify::<V4>(&config, src, dst, sport, dport, proto, dscp),
        Family::Ipv6 => classify::<V6>(&config, src, dst, sport, dport, proto, dscp),
    }
}

fn classify<F: AddressFamily>(
    config: &AclConfig,
    src: IpAddr,
    dst: IpAddr,
    sport: u16,
    dport: u16,
    proto: u8,
    dscp: u8,
) -> CliResult<()> {
    let family_addr = |ip: IpAddr| {
        F::from_ip(ip).ok_or_else(|| rtacl::Error::AddressFamilyMismatch {
            expected: F::NAME,
            actual: ip.to_string(),
        })
    };
    let flow = FieldSet::<F>::new(family_addr(src)?, family_addr(dst)?, sport, dport, proto, dscp);
    let acl = Acl::<F, String>::from_config(config)?;

    let mut hits = acl.matches(&flow);
    hits.sort_by_key(|(id, _)| *id);
    println!("flow: {}", flow);
    if hits.is_empty() {
        println!("no match");
    }
    for (_, rule) in hits {
        println!("{:<16} priority {:>4}  {}", rule.payload(), rule.priority(), rule);
    }
    Ok(())
}
