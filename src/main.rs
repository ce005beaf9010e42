extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;
extern crate ufork_asm;

use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use ufork_asm::assembler::{self, ast::Document, lexer::Tokenizer, Assembly};

use std::fs;
use std::io::Write;
use std::path::Path;

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    let ifile = args.value_of("INPUT").unwrap();
    let file_id = args.value_of("file").unwrap_or(ifile);

    debug!("Arguments:\n\tVerbosity: {}\n\tTokens Only: {}\n\tOutfile: {}\n\tInfile: {}\n\tFile id: {}",
        verbosity(args.occurrences_of("verbose")),
        args.is_present("tokens"),
        args.value_of("output").unwrap_or("None"),
        ifile,
        file_id
    );

    let ipath = Path::new(ifile);
    let source = match fs::read_to_string(&ipath) {
        Err(err) => {
            error!("fatal: unable to read input file `{}`: {}", ipath.display(), err);
            std::process::exit(1);
        },
        Ok(source) => source,
    };

    if args.is_present("tokens") {
        for token in Tokenizer::new(&source) {
            println!("{}", token);
        }
        return;
    }

    let assembly = assembler::assemble(&source, file_id);

    match &assembly {
        Assembly::Module(document) => if args.is_present("print-debug") {
            print_listing(document);
        },
        Assembly::Error(record) => error!("{}:{}:{}: {}",
            record.file,
            record.line.map_or("?".to_owned(), |line| (line + 1).to_string()),
            record.column.map_or("?".to_owned(), |column| (column + 1).to_string()),
            record.message
        ),
    }

    let json = if args.is_present("compact") {
        serde_json::to_string(&assembly)
    } else {
        serde_json::to_string_pretty(&assembly)
    };
    let json = match json {
        Err(err) => {
            error!("fatal: unable to encode the assembled module: {}", err);
            std::process::exit(1);
        },
        Ok(json) => json,
    };

    if let Some(filename) = args.value_of("output") {
        let opath = Path::new(filename);
        let mut ofile = match fs::File::create(&opath) {
            Err(err) => {
                error!("fatal: unable to open output file `{}`: {}", opath.display(), err);
                std::process::exit(1);
            },
            Ok(file) => file,
        };
        if let Err(err) = writeln!(ofile, "{}", json) {
            error!("fatal: unable to write to output file `{}`: {}", opath.display(), err);
            std::process::exit(1);
        }
    } else {
        println!("{}", json);
    }

    if let Assembly::Error(_) = assembly {
        std::process::exit(1);
    }
}

/// Prints every definition of the module as `label: kind => summary`.
fn print_listing(document: &Document) {
    let mut grid = Grid::new(GridOptions {
        filling:     Filling::Spaces(1),
        direction:   Direction::LeftToRight,
    });

    for (label, node) in document.ast.define.iter() {
        grid.add(Cell::from(format!("{}:", label)));
        grid.add(Cell::from(node.kind().to_string()));
        grid.add(Cell::from("=>".to_string()));
        grid.add(Cell::from(format!("{}", node)));
    }

    println!("{}", grid.fit_into_columns(4));
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(option_env!("CARGO_PKG_NAME").unwrap())
        .version(option_env!("CARGO_PKG_VERSION").unwrap())
        .author(option_env!("CARGO_PKG_AUTHORS").unwrap())
        .about(option_env!("CARGO_PKG_DESCRIPTION").unwrap())
        .arg(Arg::with_name("INPUT")
            .help("Sets the input file to use")
            .required(true)
            .multiple(false)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("output")
            .short("o")
            .takes_value(true)
            .help("write output to an outfile instead of STDOUT"))
        .arg(Arg::with_name("file")
            .short("f")
            .takes_value(true)
            .help("file name recorded in debug info (defaults to INPUT)"))
        .arg(Arg::with_name("tokens")
            .short("t")
            .takes_value(false)
            .help("tokenize only, printing the token stream"))
        .arg(Arg::with_name("compact")
            .short("c")
            .long("compact")
            .takes_value(false)
            .help("writes the output as a single line of JSON"))
        .arg(Arg::with_name("print-debug")
            .short("d")
            .alias("show")
            .alias("s")
            .takes_value(false)
            .help("prints a listing of the assembled definitions to STDOUT"))
        .get_matches()
}

fn verbosity(occurrences: u64) -> log::LevelFilter {
    match occurrences {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    }
}

fn initialize_logging(occurrences: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(verbosity(occurrences))
        .chain(std::io::stderr())
        .apply().ok();
}
