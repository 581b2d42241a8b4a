//! Loadcom command line interface.

use std::{process, time::Duration};

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_t, App, AppSettings::*, Arg,
};
use console::style;
use log::{debug, trace, LevelFilter};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use simplelog::*;

use loadcom::{self as lc, RecordFormat, Uploader};

fn main() {
    println!("[LC] loadcom v{}", crate_version!());

    ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        process::exit(0);
    })
    .expect("Failed to install my Ctrl-C handler!");

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Loadcom uploads a program to a bootloader over the serial port, \
            has the board run it and checks the result it reports.\n\
            \n\
            The program file is made of lines `<address>: <bytes> -- comment` \
            and its name must contain `expect_<hex>[_<hex>]*`, the result the \
            program is expected to produce. The exchange goes as follows:\n\
               \t* send `LOAD`, wait for `READY` \n\
               \t* send the length and the start address as 2 bytes each, \
                   lowest order first \n\
               \t* send the program bytes, one at a time \n\
               \t* read the checksum computed by the board \n\
               \t* send `RESET`, read the 2 result bytes, wait for `READY` \n\
            \n\
            Mismatches are reported but only fail the run with `--strict`.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("DEVICE_TTY")
                .help("the tty device the board is connected to")
                .long_help(
                    "the tty device the board is connected to; when not set, \
                     `loadcom` lists the connected serial devices for \
                     selection.",
                )
                .short("-t")
                .long("--tty")
                .takes_value(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BAUD_RATE")
                .help("serial port baud rate")
                .long_help("serial baud rate")
                .short("-b")
                .long("--baud-rate")
                .takes_value(true)
                .default_value("115200")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("DATA_BITS")
                .help("number of bits per character")
                .short("-d")
                .long("--data-bits")
                .takes_value(true)
                .possible_values(&["5", "6", "7", "8"])
                .default_value("8")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("STOP_BITS")
                .help("number of stop bits per byte")
                .short("-s")
                .long("--stop-bits")
                .takes_value(true)
                .possible_values(&["1", "2"])
                .default_value("1")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("PARITY")
                .help("parity checking protocol")
                .short("-p")
                .long("--parity")
                .takes_value(true)
                .possible_values(&["none", "odd", "even"])
                .default_value("none")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("FLOW_CONTROL")
                .help("flow control mode")
                .short("-f")
                .long("--flow-control")
                .takes_value(true)
                .possible_values(&["none", "soft", "hard"])
                .default_value("none")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("PACING")
                .help("delay after each byte sent, in milliseconds")
                .short("-i")
                .long("--pacing")
                .takes_value(true)
                .default_value("100")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("FORMAT")
                .help("how bytes are written in the program file")
                .short("-r")
                .long("--format")
                .takes_value(true)
                .possible_values(&["hex", "binary"])
                .default_value("hex")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("STRICT")
                .help("fail on handshake, checksum or result mismatches")
                .long("--strict"),
        )
        .arg(
            Arg::with_name("PROGRAM")
                .help("path to the program file to upload")
                .long_help(
                    "path to the program file to upload; its name must \
                     contain `expect_` followed by the expected result \
                     bytes in hex, separated by `_`.",
                )
                .required(true)
                .index(1),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'loadcom -v -v -v' or 'loadcom -vvv' vs 'loadcom -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    TermLogger::init(log_level, Config::default(), TerminalMode::Mixed).unwrap();

    trace!("{:#?}", matches);

    // Arguments with default values ===========================================

    // It's safe to call unwrap on all command line arguments with default
    // values, because the value with either be what the user input at runtime
    // or the default value

    let baud_rate = value_t!(matches.value_of("BAUD_RATE"), u32)
        .unwrap_or_else(|_| not_numeric(&matches, "BAUD_RATE", "baud-rate"));

    let pacing = value_t!(matches.value_of("PACING"), u64)
        .unwrap_or_else(|_| not_numeric(&matches, "PACING", "pacing"));

    let data_bits = match matches.value_of("DATA_BITS").unwrap() {
        "5" => DataBits::Five,
        "6" => DataBits::Six,
        "7" => DataBits::Seven,
        "8" => DataBits::Eight,
        _ => unreachable!(),
    };

    let stop_bits = match matches.value_of("STOP_BITS").unwrap() {
        "1" => StopBits::One,
        "2" => StopBits::Two,
        _ => unreachable!(),
    };

    let parity = match matches.value_of("PARITY").unwrap() {
        "none" => Parity::None,
        "even" => Parity::Even,
        "odd" => Parity::Odd,
        _ => unreachable!(),
    };

    let flow_control = match matches.value_of("FLOW_CONTROL").unwrap() {
        "none" => FlowControl::None,
        "soft" => FlowControl::Software,
        "hard" => FlowControl::Hardware,
        _ => unreachable!(),
    };

    let format: RecordFormat = matches.value_of("FORMAT").unwrap().parse().unwrap();

    // END - Arguments with default values =====================================

    let mut settings = lc::SettingsBuilder::new()
        .baud_rate(baud_rate)
        .data_bits(data_bits)
        .stop_bits(stop_bits)
        .parity(parity)
        .flow_control(flow_control)
        .pacing(Duration::from_millis(pacing))
        .format(format)
        .strict(matches.is_present("STRICT"))
        .finalize();

    // START - Arguments with NO default values ================================

    if let Some(path) = matches.value_of("DEVICE_TTY") {
        settings.path = Some(path.into());
    }

    // Required, clap has already refused to go on without it.
    settings.program = matches.value_of("PROGRAM").map(String::from);

    // END - Arguments =========================================================

    let exit_code = Uploader::new(settings).run();
    debug!("exit code: {}", exit_code);
    process::exit(exit_code.into());
}

fn not_numeric(matches: &clap::ArgMatches, name: &str, flag: &str) -> ! {
    println!(
        "{}: `{}` needs to be a numeric value",
        style("error").red(),
        style(flag).cyan()
    );
    println!(
        "   {} `{}` is not a valid value",
        style("-->").cyan(),
        style(matches.value_of(name).unwrap_or_default()).on_red()
    );
    process::exit(-1);
}
