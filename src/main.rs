use clap::{arg,crate_version,Command};
use huffpack::decoder::{self, UpdateOutcome};
use huffpack::encoder;
use std::path::PathBuf;

const RCH: &str = "unreachable was reached";

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::init();

    let long_help =
"Examples:
---------
Archive:       `huffpack archive -i notes -i todo.txt -o notes.hpk`
Extract all:   `huffpack extract -a notes.hpk -d restored`
Extract one:   `huffpack extract -a notes.hpk -d restored -n todo.txt`
Update:        `huffpack update -a notes.hpk -i todo.txt`";

    let mut main_cmd = Command::new("huffpack")
        .about("Package files into Huffman-coded archives")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("archive")
        .arg(arg!(-i --input <PATH> "file or directory to archive, repeatable")
            .action(clap::ArgAction::Append).required(true))
        .arg(arg!(-o --output <PATH> "archive path").required(true))
        .about("create an archive"));

    main_cmd = main_cmd.subcommand(Command::new("extract")
        .arg(arg!(-a --archive <PATH> "archive path").required(true))
        .arg(arg!(-d --dest <PATH> "destination directory").required(true))
        .arg(arg!(-n --name <NAME> "extract only the named member").required(false))
        .about("extract all members, or one by name"));

    main_cmd = main_cmd.subcommand(Command::new("info")
        .arg(arg!(-a --archive <PATH> "archive path").required(true))
        .about("list members and compression rates"));

    main_cmd = main_cmd.subcommand(Command::new("check")
        .arg(arg!(-a --archive <PATH> "archive path").required(true))
        .about("verify the archive trailer checksum"));

    main_cmd = main_cmd.subcommand(Command::new("update")
        .arg(arg!(-a --archive <PATH> "archive path").required(true))
        .arg(arg!(-i --input <PATH> "replacement file").required(true))
        .about("replace one member in place"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("archive") {
        let inputs: Vec<PathBuf> = cmd.get_many::<String>("input").expect(RCH)
            .map(PathBuf::from).collect();
        let output = PathBuf::from(cmd.get_one::<String>("output").expect(RCH));
        let count = encoder::create(&inputs,&output)?;
        println!("archived {} files into {}",count,output.display());
    }

    if let Some(cmd) = matches.subcommand_matches("extract") {
        let archive = PathBuf::from(cmd.get_one::<String>("archive").expect(RCH));
        let dest = PathBuf::from(cmd.get_one::<String>("dest").expect(RCH));
        match cmd.get_one::<String>("name") {
            Some(name) => {
                if decoder::extract_one(&archive,name,&dest)? {
                    println!("extracted {}",name);
                } else {
                    eprintln!("{} not found in archive",name);
                    std::process::exit(1);
                }
            },
            None => {
                decoder::extract_all(&archive,&dest)?;
                println!("extracted all members into {}",dest.display());
            }
        }
    }

    if let Some(cmd) = matches.subcommand_matches("info") {
        let archive = PathBuf::from(cmd.get_one::<String>("archive").expect(RCH));
        for member in decoder::list(&archive)? {
            let compressed = member.end - member.start;
            let rate = match member.size {
                0 => 0.0,
                size => 100.0 - compressed as f64 / size as f64 * 100.0
            };
            println!("{} | {} bytes | compressed to {} bytes | rate {:.1}%",
                member.name,member.size,compressed,rate);
        }
    }

    if let Some(cmd) = matches.subcommand_matches("check") {
        let archive = PathBuf::from(cmd.get_one::<String>("archive").expect(RCH));
        if decoder::check_integrity(&archive)? {
            println!("archive is intact");
        } else {
            println!("archive is corrupted");
            std::process::exit(1);
        }
    }

    if let Some(cmd) = matches.subcommand_matches("update") {
        let archive = PathBuf::from(cmd.get_one::<String>("archive").expect(RCH));
        let input = PathBuf::from(cmd.get_one::<String>("input").expect(RCH));
        match decoder::update(&archive,&input)? {
            UpdateOutcome::Updated => println!("archive updated"),
            UpdateOutcome::UpToDate => println!("member is already up to date")
        }
    }

    Ok(())
}
