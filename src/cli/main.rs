use aftl::{
    find_descriptor, AftlError, AftlVerifier, EntryPolicy, FailureMode, LogDescriptor,
    MissingDescriptorPolicy, TrustStore, VerificationPolicy,
};

use aftl::reexports::log;

use clap::{crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches, Command};
use std::fs;

fn read_image(path: &str) -> Result<Vec<u8>, AftlError> {
    fs::read(path).map_err(|e| {
        log::error!("Failed to read '{}': {}", path, e);
        AftlError::IOError(e)
    })
}

fn info(matches: &ArgMatches) -> Result<(), AftlError> {
    let input_file = matches.get_one::<String>("in").map(|s| s.as_str());
    let input_file = input_file.ok_or(AftlError::UsageError("Missing input file"))?;
    let image = read_image(input_file)?;

    let location = find_descriptor(&image).ok_or(AftlError::NoDescriptor)?;
    log::debug!(
        "Descriptor at offset {} ({} bytes follow)",
        location.offset,
        location.len
    );
    let descriptor = LogDescriptor::parse(location.descriptor(&image))?;
    print!("{}", descriptor);
    Ok(())
}

fn verify(matches: &ArgMatches) -> Result<(), AftlError> {
    let input_files: Vec<&str> = matches
        .get_many::<String>("in")
        .ok_or(AftlError::UsageError("Missing input file"))?
        .map(|s| s.as_str())
        .collect();
    let trust_file = matches
        .get_one::<String>("trust")
        .map(|s| s.as_str())
        .ok_or(AftlError::UsageError("Missing trust store file"))?;

    let mut policy = VerificationPolicy::default();
    if matches.get_flag("optional") {
        policy = policy.with_missing_descriptor(MissingDescriptorPolicy::Optional);
    }
    if matches.get_flag("any") {
        policy = policy.with_entry_policy(EntryPolicy::AnyEntry);
    }
    if matches.get_flag("accumulate") {
        policy = policy.with_failure_mode(FailureMode::Accumulate);
    }
    log::debug!(
        "Policy: {}, {}, descriptor {}",
        policy.entries,
        policy.failure_mode,
        policy.missing_descriptor
    );

    let trust_store = TrustStore::from_file(trust_file)?;
    log::debug!("{} trusted log(s)", trust_store.len());
    let verifier = AftlVerifier::new(trust_store, policy);

    for input_file in input_files {
        let image = read_image(input_file)?;
        let report = verifier.verify_detailed(&image);
        for entry in &report.entries {
            match entry.outcome {
                Ok(()) => println!("  entry {} ({}): OK", entry.entry_index, entry.log_identity),
                Err(gate) => println!(
                    "  entry {} ({}): {}",
                    entry.entry_index, entry.log_identity, gate
                ),
            }
        }
        println!("{}: {}", input_file, report.result);
        verifier.accept(report.result)?;
    }
    println!("Verification succeeded");
    Ok(())
}

fn start() -> Result<(), AftlError> {
    let matches = Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .arg(
            Arg::new("debug")
                .short('d')
                .action(ArgAction::SetTrue)
                .help("Prints debugging information"),
        )
        .subcommand(
            Command::new("info")
                .about("Print the AFTL descriptor embedded in a vbmeta image")
                .arg(
                    Arg::new("in")
                        .value_name("input_file")
                        .long("input-file")
                        .short('i')
                        .required(true)
                        .help("vbmeta image"),
                ),
        )
        .subcommand(
            Command::new("verify")
                .about("Verify the inclusion proofs of one or more vbmeta images")
                .arg(
                    Arg::new("in")
                        .value_name("input_file")
                        .long("input-file")
                        .short('i')
                        .required(true)
                        .action(ArgAction::Append)
                        .help("vbmeta image; repeat for every image of a slot"),
                )
                .arg(
                    Arg::new("trust")
                        .value_name("trust_store_file")
                        .long("trust-store")
                        .short('t')
                        .required(true)
                        .help("JSON file listing the trusted transparency logs"),
                )
                .arg(
                    Arg::new("optional")
                        .long("optional")
                        .action(ArgAction::SetTrue)
                        .help("Accept images that carry no descriptor"),
                )
                .arg(
                    Arg::new("any")
                        .long("any")
                        .action(ArgAction::SetTrue)
                        .help("Accept a descriptor if at least one entry verifies"),
                )
                .arg(
                    Arg::new("accumulate")
                        .long("accumulate")
                        .action(ArgAction::SetTrue)
                        .help("Evaluate every entry instead of stopping at the first decisive one"),
                ),
        )
        .get_matches();

    let debug = matches.get_flag("debug");

    env_logger::builder()
        .format_timestamp(None)
        .format_level(false)
        .format_module_path(false)
        .format_target(false)
        .filter_level(if debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    if let Some(matches) = matches.subcommand_matches("info") {
        info(matches)?;
    } else if let Some(matches) = matches.subcommand_matches("verify") {
        verify(matches)?;
    } else {
        return Err(AftlError::UsageError("No subcommand specified"));
    }
    Ok(())
}

fn main() -> Result<(), AftlError> {
    let res = start();
    match res {
        Ok(_) => {}
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
    Ok(())
}
