//! Command-line surface of the `wadder` binary.
//!
//! `Cli` is what `clap` parses; `Config` is the immutable, ordered form the
//! runner in [`crate::app`] executes.  Flag position on the command line
//! never matters: actions always run in [`Action`] declaration order.

use clap::Parser;
use std::{path::PathBuf, str::FromStr};

use crate::export::Format;
use crate::wad::{Hue, WidthPolicy};

/// Inspect a WAD archive and extract its lumps, maps and pictures.
#[derive(Parser, Debug)]
#[command(name = "wadder", author, version, about)]
pub struct Cli {
    /// WAD archive to read
    #[arg(value_name = "WAD")]
    pub wad: PathBuf,

    /// Print the header summary (implied when no other action is given)
    #[arg(long)]
    pub report: bool,

    /// List entries whose name starts with PREFIX
    #[arg(long, value_name = "PREFIX")]
    pub find: Vec<String>,

    /// First directory index shown by --list
    #[arg(long, value_name = "N", default_value_t = 0, requires = "list")]
    pub start: usize,

    /// List N directory entries
    #[arg(long, value_name = "N")]
    pub list: Option<usize>,

    /// Save raw lump N as NAME.lmp
    #[arg(long, value_name = "N")]
    pub save_lump: Vec<usize>,

    /// Save the eleven entries of map NAME into a directory
    #[arg(long, value_name = "NAME")]
    pub save_map: Vec<String>,

    /// Decode lump N as a picture and save it as an image
    #[arg(long, value_name = "N")]
    pub save_patch: Vec<usize>,

    /// Decode lump N as a 64x64 flat and save it as an image
    #[arg(long, value_name = "N")]
    pub save_flat: Vec<usize>,

    /// Draw the linedefs of map NAME
    #[arg(long, value_name = "NAME")]
    pub draw_map: Vec<String>,

    /// Map units per pixel for --draw-map
    #[arg(long, value_name = "N", default_value_t = 1,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub scale: u16,

    /// Write the palette as hex text and a 16x16 swatch
    #[arg(long)]
    pub dump_palette: bool,

    /// PLAYPAL block used for colour output
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub palette: usize,

    /// Recolour the palette (indigo, brown, red, green, yellow)
    #[arg(long, value_name = "HUE")]
    pub hue: Option<Hue>,

    /// Write the palette back as a 768-byte PLAYPAL<N>.lmp
    #[arg(long)]
    pub save_palette_lump: bool,

    /// COLORMAP light table; when given, saved patches and flats are shaded by it
    #[arg(long, value_name = "N")]
    pub colormap: Option<usize>,

    /// Add AMOUNT to colormap entries START..STOP (applied in order)
    #[arg(long, value_name = "START:STOP:AMOUNT", allow_hyphen_values = true)]
    pub shift: Vec<ColormapShift>,

    /// Write the selected, shifted light table as COLORMAP<N>.lmp
    #[arg(long)]
    pub save_colormap: bool,

    /// Image format: ppm, pgm, pbm or png
    #[arg(long, value_name = "FMT", default_value = "ppm")]
    pub format: Format,

    /// Directory receiving every written file
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Decode pictures wider than 255 by truncating the width
    #[arg(long)]
    pub allow_wide: bool,

    /// Keep read lumps in memory
    #[arg(long)]
    pub cache: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// `START:STOP:AMOUNT` argument of `--shift`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColormapShift {
    pub start: usize,
    pub stop: usize,
    pub amount: i16,
}

impl FromStr for ColormapShift {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || format!("bad shift `{s}` (expected START:STOP:AMOUNT)");
        let mut parts = s.split(':');
        let (Some(start), Some(stop), Some(amount), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(bad());
        };
        Ok(Self {
            start: start.trim().parse().map_err(|_| bad())?,
            stop: stop.trim().parse().map_err(|_| bad())?,
            amount: amount.trim().parse().map_err(|_| bad())?,
        })
    }
}

/// One unit of work.  Variant order is execution order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Report,
    Find(String),
    List { start: usize, count: usize },
    SaveLump(usize),
    SaveMap(String),
    SavePatch(usize),
    SaveFlat(usize),
    DrawMap { name: String, scale: u16 },
    DumpPalette,
    SavePaletteLump,
    SaveColormap,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub wad_path: PathBuf,
    pub out_dir: PathBuf,
    pub format: Format,
    pub palette_index: usize,
    pub hue: Option<Hue>,
    /// Light table used by `SaveColormap` and for shading images.
    pub colormap_index: Option<usize>,
    pub shifts: Vec<ColormapShift>,
    pub width_policy: WidthPolicy,
    pub cache: bool,
    pub quiet: bool,
    pub actions: Vec<Action>,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Self {
        let mut actions = Vec::new();
        if cli.report {
            actions.push(Action::Report);
        }
        actions.extend(cli.find.into_iter().map(Action::Find));
        if let Some(count) = cli.list {
            actions.push(Action::List {
                start: cli.start,
                count,
            });
        }
        actions.extend(cli.save_lump.into_iter().map(Action::SaveLump));
        actions.extend(cli.save_map.into_iter().map(Action::SaveMap));
        actions.extend(cli.save_patch.into_iter().map(Action::SavePatch));
        actions.extend(cli.save_flat.into_iter().map(Action::SaveFlat));
        actions.extend(cli.draw_map.into_iter().map(|name| Action::DrawMap {
            name,
            scale: cli.scale,
        }));
        if cli.dump_palette {
            actions.push(Action::DumpPalette);
        }
        if cli.save_palette_lump {
            actions.push(Action::SavePaletteLump);
        }
        if cli.save_colormap {
            actions.push(Action::SaveColormap);
        }
        if actions.is_empty() {
            actions.push(Action::Report);
        }

        Self {
            wad_path: cli.wad,
            out_dir: cli.out_dir,
            format: cli.format,
            palette_index: cli.palette,
            hue: cli.hue,
            colormap_index: cli.colormap,
            shifts: cli.shift,
            width_policy: if cli.allow_wide {
                WidthPolicy::Truncate
            } else {
                WidthPolicy::Reject
            },
            cache: cli.cache,
            quiet: cli.quiet,
            actions,
        }
    }

    /// `true` when some action writes into `out_dir`.
    pub fn writes_files(&self) -> bool {
        self.actions.iter().any(|a| {
            !matches!(a, Action::Report | Action::Find(_) | Action::List { .. })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> Config {
        let argv = std::iter::once("wadder").chain(args.iter().copied());
        Config::from_cli(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn report_is_implied() {
        let cfg = config(&["doom1.wad"]);
        assert_eq!(cfg.actions, vec![Action::Report]);
        assert_eq!(cfg.format, Format::Ppm);
        assert_eq!(cfg.width_policy, WidthPolicy::Reject);
        assert!(!cfg.writes_files());
    }

    #[test]
    fn actions_follow_canonical_order() {
        let cfg = config(&[
            "doom1.wad",
            "--dump-palette",
            "--save-patch",
            "7",
            "--find",
            "E1",
            "--save-lump",
            "3",
            "--report",
            "--save-lump",
            "1",
            "--list",
            "4",
            "--start",
            "2",
        ]);
        assert_eq!(
            cfg.actions,
            vec![
                Action::Report,
                Action::Find("E1".into()),
                Action::List { start: 2, count: 4 },
                Action::SaveLump(3),
                Action::SaveLump(1),
                Action::SavePatch(7),
                Action::DumpPalette,
            ]
        );
        assert!(cfg.writes_files());
    }

    #[test]
    fn output_options() {
        let cfg = config(&[
            "doom2.wad",
            "--draw-map",
            "MAP01",
            "--scale",
            "8",
            "--hue",
            "Brown",
            "--format",
            "png",
            "-o",
            "out",
            "--allow-wide",
            "--palette",
            "3",
            "-q",
        ]);
        assert_eq!(
            cfg.actions,
            vec![Action::DrawMap {
                name: "MAP01".into(),
                scale: 8
            }]
        );
        assert_eq!(cfg.hue, Some(Hue::Brown));
        assert_eq!(cfg.format, Format::Png);
        assert_eq!(cfg.out_dir, PathBuf::from("out"));
        assert_eq!(cfg.width_policy, WidthPolicy::Truncate);
        assert_eq!(cfg.palette_index, 3);
        assert!(cfg.quiet);
    }

    #[test]
    fn colormap_options() {
        let cfg = config(&[
            "doom1.wad",
            "--save-colormap",
            "--shift",
            "0:16:-4",
            "--colormap",
            "2",
            "--shift",
            "32:48:2",
            "--save-palette-lump",
        ]);
        assert_eq!(cfg.actions, vec![Action::SavePaletteLump, Action::SaveColormap]);
        assert_eq!(cfg.colormap_index, Some(2));
        assert_eq!(
            cfg.shifts,
            vec![
                ColormapShift { start: 0, stop: 16, amount: -4 },
                ColormapShift { start: 32, stop: 48, amount: 2 },
            ]
        );
        assert!(cfg.writes_files());
    }

    #[test]
    fn shift_needs_three_fields() {
        assert!("1:2".parse::<ColormapShift>().is_err());
        assert!("1:2:3:4".parse::<ColormapShift>().is_err());
        assert!("a:2:3".parse::<ColormapShift>().is_err());
        assert!("1:2:40000".parse::<ColormapShift>().is_err());
    }

    #[test]
    fn rejects_bad_values() {
        for args in [
            &["wadder", "x.wad", "--hue", "purple"][..],
            &["wadder", "x.wad", "--format", "gif"],
            &["wadder", "x.wad", "--draw-map", "E1M1", "--scale", "0"],
            &["wadder", "x.wad", "--start", "3"],
            &["wadder", "x.wad", "--shift", "0:4"],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{args:?}");
        }
    }
}
