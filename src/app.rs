//! Executes a [`Config`] against an archive.
//!
//! Text output (report, find, list) goes to the supplied writer; every
//! other action writes files under `Config::out_dir`.  A failing action is
//! logged and counted, and the remaining actions still run.

use anyhow::{Context, Result};
use log::{error, info};
use std::{
    fs::{self, File},
    io::{BufWriter, Read, Seek, Write},
    path::{Path, PathBuf},
};

use crate::config::{Action, Config};
use crate::export::{self, Format};
use crate::wad::{Colormap, DirectoryEntry, LumpName, Palette, Raster, Wad, decode_flat};

/// Summary of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub succeeded: usize,
    pub failures: usize,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.failures == 0
    }
}

/// Open `config.wad_path` and run every action, printing to stdout.
pub fn run(config: &Config) -> Result<Outcome> {
    let wad = Wad::open(&config.wad_path)
        .with_context(|| format!("opening {}", config.wad_path.display()))?;
    let mut wad = if config.cache { wad.with_cache() } else { wad };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_on(&mut wad, config, &mut out)
}

/// Run every action of `config` against an already opened archive.
pub fn run_on<R: Read + Seek, W: Write>(
    wad: &mut Wad<R>,
    config: &Config,
    out: &mut W,
) -> Result<Outcome> {
    if config.writes_files() {
        fs::create_dir_all(&config.out_dir)
            .with_context(|| format!("creating {}", config.out_dir.display()))?;
    }

    let mut runner = Runner {
        wad,
        config,
        palette: None,
        colormap: None,
    };
    let mut outcome = Outcome::default();
    for action in &config.actions {
        match runner.exec(action, out) {
            Ok(()) => outcome.succeeded += 1,
            Err(err) => {
                error!("{action:?}: {err:#}");
                outcome.failures += 1;
            }
        }
    }
    Ok(outcome)
}

struct Runner<'a, R> {
    wad: &'a mut Wad<R>,
    config: &'a Config,
    /// Resolved once, on first use.
    palette: Option<Palette>,
    colormap: Option<Colormap>,
}

impl<R: Read + Seek> Runner<'_, R> {
    fn exec<W: Write>(&mut self, action: &Action, out: &mut W) -> Result<()> {
        match action {
            Action::Report => writeln!(out, "{}", self.wad.report())?,
            Action::Find(prefix) => {
                for (idx, entry) in self.wad.find(prefix) {
                    print_entry(out, idx, entry)?;
                }
            }
            Action::List { start, count } => {
                if *count > 0 {
                    self.wad.entry(*start)?;
                }
                let dir = self.wad.directory();
                let end = start.saturating_add(*count).min(dir.len());
                for (idx, entry) in dir.iter().enumerate().take(end).skip(*start) {
                    print_entry(out, idx, entry)?;
                }
            }
            Action::SaveLump(idx) => self.save_lump(*idx)?,
            Action::SaveMap(name) => self.save_map(name)?,
            Action::SavePatch(idx) => {
                let raster = self
                    .wad
                    .load_picture(*idx, self.config.width_policy)?
                    .rasterize()?;
                self.save_image(*idx, raster)?;
            }
            Action::SaveFlat(idx) => {
                let raster = decode_flat(&self.wad.lump(*idx)?)?;
                self.save_image(*idx, raster)?;
            }
            Action::DrawMap { name, scale } => {
                let marker = self.wad.locate_map(name)?;
                let level = self.wad.load_level(marker)?;
                let raster = export::draw_map(&level, *scale)?;
                let path = self.output_path(&level.name, self.config.format.extension());
                write_image(&path, self.config.format, &raster, Some(&export::map_palette()))?;
            }
            Action::DumpPalette => {
                let palette = self.palette()?.clone();
                let txt = self.output_path("PLAYPAL", "txt");
                let mut file = create(&txt)?;
                export::write_hex(&mut file, &palette)?;
                file.flush()?;
                info!("saved {}", txt.display());

                let swatch = export::palette_swatch();
                let img = self.output_path("PLAYPAL", self.config.format.extension());
                write_image(&img, self.config.format, &swatch, Some(&palette))?;
            }
            Action::SavePaletteLump => {
                let bytes = self.palette()?.to_bytes();
                let stem = format!("PLAYPAL{}", self.config.palette_index);
                self.save_bytes(&stem, &bytes)?;
            }
            Action::SaveColormap => {
                let table = self.colormap()?.0;
                let stem = format!("COLORMAP{}", self.config.colormap_index.unwrap_or(0));
                self.save_bytes(&stem, &table)?;
            }
        }
        Ok(())
    }

    /// PLAYPAL block `palette_index`, grayscale when the archive has none,
    /// recoloured by `hue` if one is set.
    fn palette(&mut self) -> Result<&Palette> {
        if self.palette.is_none() {
            let base = match self.wad.find_lump("PLAYPAL") {
                Some(_) => self.wad.load_palette(self.config.palette_index)?,
                None => Palette::grayscale(),
            };
            let resolved = match self.config.hue {
                Some(hue) => base.translate(hue)?,
                None => base,
            };
            self.palette = Some(resolved);
        }
        Ok(self.palette.get_or_insert_with(Palette::grayscale))
    }

    /// Light table `colormap_index` (0 when unset) with every `--shift`
    /// applied in order.
    fn colormap(&mut self) -> Result<&Colormap> {
        if self.colormap.is_none() {
            let mut table = self
                .wad
                .load_colormap(self.config.colormap_index.unwrap_or(0))?;
            for s in &self.config.shifts {
                table = table.shift(s.start, s.stop, s.amount)?;
            }
            self.colormap = Some(table);
        }
        Ok(self.colormap.get_or_insert_with(Colormap::default))
    }

    fn save_bytes(&self, stem: &str, bytes: &[u8]) -> Result<()> {
        let path = self.output_path(stem, "lmp");
        fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        info!("saved {}", path.display());
        Ok(())
    }

    fn save_lump(&mut self, idx: usize) -> Result<()> {
        let name = self.wad.entry(idx)?.name;
        let bytes = self.wad.lump(idx)?;
        self.save_bytes(&file_stem(&name, idx), &bytes)
    }

    fn save_map(&mut self, name: &str) -> Result<()> {
        let marker = self.wad.locate_map(name)?;
        let entries: Vec<DirectoryEntry> = self.wad.map_entries(marker)?.to_vec();
        let dir = self.config.out_dir.join(file_stem(&entries[0].name, marker));
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        for (offset, entry) in entries.iter().enumerate() {
            let bytes = self.wad.read_entry(entry)?;
            let path = dir
                .join(file_stem(&entry.name, marker + offset))
                .with_extension("lmp");
            fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        }
        info!("saved {} ({} lumps)", dir.display(), entries.len());
        Ok(())
    }

    /// Shade by the selected light table, if any, then write with the palette.
    fn save_image(&mut self, idx: usize, mut raster: Raster) -> Result<()> {
        let name = self.wad.entry(idx)?.name;
        if self.config.colormap_index.is_some() {
            self.colormap()?.apply(&mut raster.pixels);
        }
        let palette = self.palette()?.clone();
        let path = self.output_path(&file_stem(&name, idx), self.config.format.extension());
        write_image(&path, self.config.format, &raster, Some(&palette))
    }

    fn output_path(&self, stem: &str, ext: &str) -> PathBuf {
        self.config.out_dir.join(format!("{stem}.{ext}"))
    }
}

/// Lump name made safe for a file name; `lumpN` when nothing is left.
fn file_stem(name: &LumpName, idx: usize) -> String {
    let stem: String = name
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        format!("lump{idx}")
    } else {
        stem
    }
}

fn print_entry<W: Write>(out: &mut W, idx: usize, entry: &DirectoryEntry) -> Result<()> {
    writeln!(
        out,
        "{idx:>5}  {:<8}  {:>8}  {:>10}",
        entry.name.as_str(),
        entry.size,
        entry.position
    )?;
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_image(path: &Path, format: Format, raster: &Raster, palette: Option<&Palette>) -> Result<()> {
    let mut file = create(path)?;
    export::write_raster(&mut file, format, raster, palette)
        .with_context(|| format!("encoding {}", path.display()))?;
    file.flush()?;
    info!("saved {}", path.display());
    Ok(())
}

/*====================================================================*/
/*                               Tests                                */
/*====================================================================*/
