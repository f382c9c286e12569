use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use fontsub::{subset_with_report, Options, Outcome, Profile, Selection};

/// Parse a list like `1,2,5-9` into the numbers it names. Numbers are read
/// in the given radix.
fn parse_list(list: &str, radix: u32) -> Result<Vec<u32>, String> {
    let parse = |s: &str| {
        u32::from_str_radix(s.trim(), radix).map_err(|err| format!("invalid number {s:?}: {err}"))
    };

    let mut values = vec![];
    for el in list.split(',').filter(|s| !s.trim().is_empty()) {
        match el.split_once('-') {
            Some((first, last)) => {
                let (first, last) = (parse(first)?, parse(last)?);
                if first > last {
                    return Err(format!("invalid range {el:?}"));
                }
                values.extend(first..=last);
            }
            None => values.push(parse(el)?),
        }
    }

    Ok(values)
}

fn parse_gids(gids: &str) -> Result<Vec<u16>, String> {
    if gids == "*" {
        return Ok((0..=u16::MAX).collect());
    }

    parse_list(gids, 10)?
        .into_iter()
        .map(|gid| u16::try_from(gid).map_err(|_| format!("glyph id {gid} is too large")))
        .collect()
}

fn parse_unicodes(unicodes: &str) -> Result<Vec<u32>, String> {
    let unicodes = unicodes.replace("U+", "").replace("u+", "");
    parse_list(&unicodes, 16)
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ProfileArg {
    /// Keep every table and glyph slot.
    Subset,
    /// Like subset, plus a record of the kept glyphs.
    Mergeable,
    /// Renumbered glyphs and structural tables only.
    Delta,
}

impl From<ProfileArg> for Profile {
    fn from(profile: ProfileArg) -> Self {
        match profile {
            ProfileArg::Subset => Profile::Subset,
            ProfileArg::Mergeable => Profile::Mergeable,
            ProfileArg::Delta => Profile::Delta,
        }
    }
}

/// Subset a TrueType font down to a few glyphs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The input font file.
    input: PathBuf,

    /// The output font file.
    output: PathBuf,

    /// Glyph ids to keep, e.g. `0-5,9` or `*` for all.
    #[arg(short, long, conflicts_with_all = ["chars", "unicodes"])]
    gids: Option<String>,

    /// Text whose characters to keep.
    #[arg(short, long, conflicts_with = "unicodes")]
    chars: Option<String>,

    /// Hexadecimal code points to keep, e.g. `41-5A,U+B7`.
    #[arg(short, long)]
    unicodes: Option<String>,

    /// The shape of the output font.
    #[arg(short, long, value_enum, default_value_t = ProfileArg::Subset)]
    profile: ProfileArg,

    /// The font index inside a collection.
    #[arg(long, default_value_t = 0)]
    index: u32,

    /// Only keep Microsoft name records of this language id.
    #[arg(long)]
    language: Option<u16>,

    /// The cmap platform characters are resolved through.
    #[arg(long, default_value_t = 3)]
    platform: u16,

    /// The cmap encoding characters are resolved through.
    #[arg(long, default_value_t = 1)]
    encoding: u16,

    /// Don't keep glyphs that are only reachable through layout tables.
    #[arg(long)]
    no_automap: bool,
}

// Note that this is more of an experimental CLI used for testing.
fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let selection = match (&args.gids, &args.chars, &args.unicodes) {
        (Some(gids), _, _) => parse_gids(gids).map(Selection::Glyphs),
        (_, Some(text), _) => Ok(Selection::Chars(text.chars().map(u32::from).collect())),
        (_, _, Some(unicodes)) => parse_unicodes(unicodes).map(Selection::Chars),
        (None, None, None) => Ok(Selection::Glyphs((0..=5).collect())),
    };

    let selection = match selection {
        Ok(selection) => selection,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let options = Options::default()
        .with_index(args.index)
        .with_selection(selection)
        .with_profile(args.profile.into())
        .with_language(args.language)
        .with_cmap(args.platform, args.encoding)
        .with_automap(!args.no_automap);

    let data = match std::fs::read(&args.input) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("failed to read {}: {err}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    let sub = match subset_with_report(&data, &options) {
        Ok(sub) => sub,
        Err(err) => {
            eprintln!("failed to subset: {err}");
            return ExitCode::FAILURE;
        }
    };

    match sub.outcome {
        Outcome::Subsetted => log::info!(
            "kept {} glyphs, {} -> {} bytes",
            sub.kept_glyphs,
            data.len(),
            sub.data.len()
        ),
        Outcome::Unchanged => log::warn!("subsetting would grow the font, wrote it unchanged"),
    }

    if let Err(err) = std::fs::write(&args.output, sub.data) {
        eprintln!("failed to write {}: {err}", args.output.display());
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_glyph_lists() {
        assert_eq!(parse_gids("1,2,5-7"), Ok(vec![1, 2, 5, 6, 7]));
        assert_eq!(parse_gids("3,").map(|g| g.len()), Ok(1));
        assert_eq!(parse_gids("*").map(|g| g.len()), Ok(65536));
        assert!(parse_gids("70000").is_err());
        assert!(parse_gids("9-3").is_err());
    }

    #[test]
    fn parses_hex_code_points() {
        assert_eq!(parse_unicodes("41-43,U+B7"), Ok(vec![0x41, 0x42, 0x43, 0xB7]));
    }
}
