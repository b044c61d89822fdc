// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    clap::{Arg, ArgMatches, Command},
    log::{info, warn, LevelFilter},
    mobileconfig_profile::{
        build_profile, find_provider, output_filename, write_profile, DnsProtocol, PayloadScope,
        ProfileConfig, ProfileError, SigningMaterial, DNS_PROVIDERS,
    },
    mobileconfig_signing::{
        get_certificate_info, parse_certificate_chain, sign_mobile_config, validate_certificate,
        validate_private_key, verify_signed_profile, ValidationResult,
    },
    mobileconfig_x509::UNKNOWN_NAME,
    std::{path::PathBuf, str::FromStr},
};

const GENERATE_ABOUT: &str = "\
Generate an encrypted DNS configuration profile.

Settings are resolved in order: the YAML file given by --config, then the
preset given by --provider, then individual flags. Later sources override
earlier ones.

When --certificate and --key are given the profile is signed. Signing
failures are fatal unless --unsigned-on-failure is given, in which case the
unsigned profile is written instead.
";

fn add_signing_args(command: Command<'static>) -> Command<'static> {
    command
        .arg(
            Arg::new("certificate")
                .long("certificate")
                .takes_value(true)
                .requires("key")
                .help("Path to PEM file holding the signing certificate"),
        )
        .arg(
            Arg::new("key")
                .long("key")
                .takes_value(true)
                .requires("certificate")
                .help("Path to PEM file holding the unencrypted private key"),
        )
        .arg(
            Arg::new("chain")
                .long("chain")
                .takes_value(true)
                .multiple_occurrences(true)
                .help("Path to PEM file with intermediate certificates to embed"),
        )
}

fn build_cli() -> Command<'static> {
    let app = Command::new("mobileconfig")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate and sign Apple encrypted DNS configuration profiles")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .multiple_occurrences(true)
                .help("Increase logging verbosity. Can be specified multiple times."),
        );

    let app = app.subcommand(add_signing_args(
        Command::new("generate")
            .about("Generate a configuration profile")
            .long_about(GENERATE_ABOUT)
            .arg(
                Arg::new("config")
                    .long("config")
                    .takes_value(true)
                    .help("YAML file holding profile settings"),
            )
            .arg(
                Arg::new("provider")
                    .long("provider")
                    .takes_value(true)
                    .help("Id of a DNS provider preset (see `providers`)"),
            )
            .arg(
                Arg::new("name")
                    .long("name")
                    .takes_value(true)
                    .help("Profile display name"),
            )
            .arg(
                Arg::new("identifier")
                    .long("identifier")
                    .takes_value(true)
                    .help("Reverse-DNS profile identifier"),
            )
            .arg(
                Arg::new("organization")
                    .long("organization")
                    .takes_value(true)
                    .help("Organization shown with the profile"),
            )
            .arg(
                Arg::new("protocol")
                    .long("protocol")
                    .takes_value(true)
                    .possible_values(["https", "tls"])
                    .ignore_case(true)
                    .help("Encrypted DNS transport"),
            )
            .arg(
                Arg::new("server")
                    .long("server")
                    .takes_value(true)
                    .help("DoH URL or DoT server name"),
            )
            .arg(
                Arg::new("ip")
                    .long("ip")
                    .takes_value(true)
                    .multiple_occurrences(true)
                    .help("Bootstrap IP address of the DNS server"),
            )
            .arg(
                Arg::new("encrypted_only")
                    .long("encrypted-only")
                    .help("Prevent users from disabling the DNS settings"),
            )
            .arg(
                Arg::new("scope")
                    .long("scope")
                    .takes_value(true)
                    .possible_values(["system", "user"])
                    .ignore_case(true)
                    .help("Install the profile for the device or the current user"),
            )
            .arg(
                Arg::new("output")
                    .long("output")
                    .takes_value(true)
                    .help("Path to write the profile to. Derived from the name by default."),
            )
            .arg(
                Arg::new("unsigned_on_failure")
                    .long("unsigned-on-failure")
                    .help("Write an unsigned profile if signing fails"),
            ),
    ));

    let app = app.subcommand(
        add_signing_args(
            Command::new("sign")
                .about("Sign an existing profile")
                .arg(
                    Arg::new("input")
                        .long("input")
                        .takes_value(true)
                        .required(true)
                        .help("Profile XML to sign"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .takes_value(true)
                        .required(true)
                        .help("Path to write the signed profile to"),
                ),
        )
        .mut_arg("certificate", |arg| arg.required(true))
        .mut_arg("key", |arg| arg.required(true)),
    );

    let app = app.subcommand(
        Command::new("verify")
            .about("Verify the signature of a signed profile")
            .arg(
                Arg::new("input")
                    .long("input")
                    .takes_value(true)
                    .required(true)
                    .help("Signed profile to verify"),
            ),
    );

    let app = app.subcommand(
        Command::new("validate-certificate")
            .about("Check that a PEM file holds a usable certificate")
            .arg(Arg::new("path").required(true).help("PEM file to check")),
    );

    let app = app.subcommand(
        Command::new("validate-key")
            .about("Check that a PEM file holds a usable private key")
            .arg(Arg::new("path").required(true).help("PEM file to check")),
    );

    let app = app.subcommand(
        Command::new("certificate-info")
            .about("Print information about each certificate in a PEM file")
            .arg(Arg::new("path").required(true).help("PEM file to examine")),
    );

    app.subcommand(Command::new("providers").about("List the DNS provider presets"))
}

fn read_text(path: &str) -> Result<String, ProfileError> {
    Ok(std::fs::read_to_string(path)?)
}

fn signing_material_from_args(args: &ArgMatches) -> Result<Option<SigningMaterial>, ProfileError> {
    let (certificate, key) = match (args.value_of("certificate"), args.value_of("key")) {
        (Some(certificate), Some(key)) => (certificate, key),
        (None, None) => return Ok(None),
        _ => return Err(ProfileError::CliBadArgument),
    };

    let chain_certificate_pems = args
        .values_of("chain")
        .map(|paths| paths.map(read_text).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();

    Ok(Some(SigningMaterial {
        signing_certificate_pem: read_text(certificate)?,
        private_key_pem: read_text(key)?,
        chain_certificate_pems,
    }))
}

/// Resolve profile settings from the `generate` arguments.
fn config_from_args(args: &ArgMatches) -> Result<ProfileConfig, ProfileError> {
    let mut config = match args.value_of("config") {
        Some(path) => ProfileConfig::from_yaml_path(path)?,
        None => ProfileConfig::default(),
    };

    if let Some(protocol) = args.value_of("protocol") {
        config.dns_protocol =
            DnsProtocol::from_str(protocol).map_err(|_| ProfileError::CliBadArgument)?;
    }

    if let Some(provider) = args.value_of("provider") {
        find_provider(provider)?.apply(&mut config);
    }

    if let Some(name) = args.value_of("name") {
        config.profile_name = name.to_string();
    }
    if let Some(identifier) = args.value_of("identifier") {
        config.profile_identifier = identifier.to_string();
    }
    if let Some(organization) = args.value_of("organization") {
        config.organization_name = organization.to_string();
    }
    if let Some(server) = args.value_of("server") {
        config.server_url = server.to_string();
    }
    if let Some(ips) = args.values_of("ip") {
        config.server_ips = ips.map(|ip| ip.to_string()).collect();
    }
    if args.is_present("encrypted_only") {
        config.encrypted_only = true;
    }
    if let Some(scope) = args.value_of("scope") {
        config.payload_scope =
            PayloadScope::from_str(scope).map_err(|_| ProfileError::CliBadArgument)?;
    }

    Ok(config)
}

fn command_generate(args: &ArgMatches) -> Result<(), ProfileError> {
    let config = config_from_args(args)?;
    let signing = signing_material_from_args(args)?;

    let profile = build_profile(
        &config,
        signing.as_ref(),
        args.is_present("unsigned_on_failure"),
    )?;

    let output = match args.value_of("output") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(output_filename(config.profile_name.trim())),
    };

    if signing.is_some() && !profile.is_signed() {
        warn!("{} is not signed", output.display());
    }

    write_profile(&output, profile.as_bytes())?;

    Ok(())
}

fn command_sign(args: &ArgMatches) -> Result<(), ProfileError> {
    let input = args.value_of("input").ok_or(ProfileError::CliBadArgument)?;
    let output = args.value_of("output").ok_or(ProfileError::CliBadArgument)?;
    let material = signing_material_from_args(args)?.ok_or(ProfileError::CliBadArgument)?;

    let xml = read_text(input)?;
    let der = sign_mobile_config(&xml, &material)?;
    write_profile(output, &der)?;

    Ok(())
}

fn command_verify(args: &ArgMatches) -> Result<(), ProfileError> {
    let input = args.value_of("input").ok_or(ProfileError::CliBadArgument)?;

    let data = std::fs::read(input)?;
    let verified = verify_signed_profile(&data)?;

    println!(
        "signer: {}",
        verified
            .signer
            .subject_common_name()
            .unwrap_or_else(|| UNKNOWN_NAME.to_string())
    );
    println!("signature algorithm: {}", verified.signature_algorithm);
    if let Some(time) = verified.signing_time {
        println!("signing time: {}", time.to_rfc3339());
    }
    println!("embedded certificates: {}", verified.certificates.len());
    println!("content length: {}", verified.content.len());
    info!("signature is valid");

    Ok(())
}

fn report_validation(path: &str, result: ValidationResult) -> Result<(), ProfileError> {
    match result {
        ValidationResult::Valid => {
            println!("{}: valid", path);
            Ok(())
        }
        ValidationResult::Invalid { reason, message } => Err(ProfileError::ValidationFailed(
            format!("{}: {} ({:?})", path, message, reason),
        )),
    }
}

fn command_validate_certificate(args: &ArgMatches) -> Result<(), ProfileError> {
    let path = args.value_of("path").ok_or(ProfileError::CliBadArgument)?;

    report_validation(path, validate_certificate(&read_text(path)?))
}

fn command_validate_key(args: &ArgMatches) -> Result<(), ProfileError> {
    let path = args.value_of("path").ok_or(ProfileError::CliBadArgument)?;

    report_validation(path, validate_private_key(&read_text(path)?))
}

fn command_certificate_info(args: &ArgMatches) -> Result<(), ProfileError> {
    let path = args.value_of("path").ok_or(ProfileError::CliBadArgument)?;

    let chain = parse_certificate_chain(&read_text(path)?);
    if chain.is_empty() {
        return Err(ProfileError::ValidationFailed(format!(
            "{}: no PEM certificate block found",
            path
        )));
    }

    for (i, pem) in chain.iter().enumerate() {
        println!("# Certificate {}", i);
        println!();

        match get_certificate_info(pem) {
            Some(info) => {
                println!("Subject CN:           {}", info.subject_common_name);
                println!("Issuer CN:            {}", info.issuer_common_name);
                println!("Not Before:           {}", info.not_before.to_rfc3339());
                println!("Not After:            {}", info.not_after.to_rfc3339());
                println!("Public Key Algorithm: {}", info.public_key_algorithm);
            }
            None => {
                warn!("certificate {} could not be parsed", i);
            }
        }
        println!();
    }

    Ok(())
}

fn command_providers(_args: &ArgMatches) -> Result<(), ProfileError> {
    for provider in DNS_PROVIDERS {
        println!("{} ({})", provider.id, provider.name);
        println!("  {}", provider.description);

        if !provider.is_custom() {
            println!("  DoH: {}", provider.doh_url);
            println!("  DoT: {}", provider.dot_hostname);
            println!("  IPs: {}", provider.ips.join(", "));
        }
    }

    Ok(())
}

fn main_impl() -> Result<(), ProfileError> {
    let matches = build_cli().get_matches();

    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();

    match matches.subcommand() {
        Some(("certificate-info", args)) => command_certificate_info(args),
        Some(("generate", args)) => command_generate(args),
        Some(("providers", args)) => command_providers(args),
        Some(("sign", args)) => command_sign(args),
        Some(("validate-certificate", args)) => command_validate_certificate(args),
        Some(("validate-key", args)) => command_validate_key(args),
        Some(("verify", args)) => command_verify(args),
        _ => Err(ProfileError::CliUnknownCommand),
    }
}

fn main() {
    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {}", err);
            1
        }
    };

    std::process::exit(exit_code)
}
