use std::fs::File;
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use log::info;
use serde::Serialize;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};

use pdfnotes::pdf::{MupdfBackend, Rect, Selection, SelectionMode, ZoomSetting};
use pdfnotes::{Settings, Viewer, WriterSink, panic_handler, settings};

type CliViewer = Viewer<MupdfBackend, WriterSink<Stdout>>;

/// Select lines, text spans and image regions on PDF pages.
///
/// Coordinates are document units with the origin in the top-left corner of
/// the page.
#[derive(Debug, Parser)]
#[command(name = "pdfnotes", about, version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Write the log to this file instead of stderr
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Settings file (default: <config dir>/pdfnotes/config.yaml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print page count and the size of a page
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Select the line under a point
    Line {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, default_value_t = 1)]
        page: usize,

        x: f32,
        y: f32,

        /// Insert the selected line into the output notes
        #[arg(long)]
        insert: bool,
    },

    /// Select the text inside a dragged region
    Text {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Region as x1,y1,x2,y2
        #[arg(value_parser = parse_rect)]
        region: Rect,

        /// Insert the selected text into the output notes
        #[arg(long)]
        insert: bool,
    },

    /// Export a page region as a PNG image
    Image {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Region as x1,y1,x2,y2
        #[arg(value_parser = parse_rect)]
        region: Rect,

        /// Directory receiving the image
        #[arg(long, default_value = ".")]
        attachments: PathBuf,

        /// Size the inserted image at this zoom (percent)
        #[arg(long)]
        pin_zoom: Option<f32>,
    },

    /// Render a page, optionally with a text selection highlighted
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Zoom preset in percent (20, 40, 60, 80, 100, 200, 300, 400) or
        /// "fit"; fits the page to --width when omitted
        #[arg(long)]
        zoom: Option<ZoomSetting>,

        /// Viewport width in pixels used for fit-to-width
        #[arg(long, default_value_t = 800.0)]
        width: f32,

        /// Highlight the text inside x1,y1,x2,y2 (document units)
        #[arg(long, value_parser = parse_rect)]
        region: Option<Rect>,

        #[arg(short, long, value_name = "PNG")]
        output: PathBuf,
    },
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let values: Vec<f32> = s
        .split(',')
        .map(|v| v.trim().parse::<f32>().map_err(|e| format!("{v:?}: {e}")))
        .collect::<Result<_, _>>()?;
    match values.as_slice() {
        [x1, y1, x2, y2] => Ok(Rect::normalize(*x1, *y1, *x2, *y2)),
        _ => Err(format!("expected x1,y1,x2,y2, got {s:?}")),
    }
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    pages: usize,
    page: usize,
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct SelectionOutput<'a> {
    mode: &'static str,
    text: Option<&'a str>,
    areas: &'a [Rect],
}

impl<'a> From<&'a Selection> for SelectionOutput<'a> {
    fn from(selection: &'a Selection) -> Self {
        Self {
            mode: selection.mode.as_str(),
            text: selection.text.as_deref(),
            areas: &selection.areas,
        }
    }
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    match log_file {
        Some(path) => WriteLogger::init(
            level,
            Config::default(),
            File::create(path).with_context(|| format!("Failed to create log file {path:?}"))?,
        )?,
        None => TermLogger::init(
            level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )?,
    }
    Ok(())
}

/// Open `file` at 100% zoom on the 1-based `page`.
fn open_viewer(file: &Path, page: usize, settings: Settings, attachments: &Path) -> Result<CliViewer> {
    let mut viewer = Viewer::new(WriterSink::new(io::stdout(), attachments), settings);
    viewer.open(file)?;
    viewer.set_zoom(ZoomSetting::Percent(100.0));

    if !viewer.go_to_page_label(&page.to_string()) && page != 1 {
        bail!(
            "page {page} out of range (document has {})",
            viewer.document().page().pages_count
        );
    }
    Ok(viewer)
}

fn drag(viewer: &mut CliViewer, region: &Rect) -> Result<()> {
    viewer.pointer_down(region.x1, region.y1)?;
    viewer.pointer_move(region.x2, region.y2)?;
    viewer.pointer_up(region.x2, region.y2)?;
    Ok(())
}

/// Click inside the first held area, committing the selection.
fn click_selection(viewer: &mut CliViewer) -> Result<()> {
    let Some(area) = viewer.selection().areas.first().copied() else {
        bail!("nothing selected");
    };
    let (x, y) = ((area.x1 + area.x2) / 2.0, (area.y1 + area.y2) / 2.0);
    viewer.pointer_down(x, y)?;
    viewer.pointer_up(x, y)?;
    Ok(())
}

fn print_selection(viewer: &CliViewer) -> Result<()> {
    let output = SelectionOutput::from(viewer.selection());
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let settings = settings::load_or_default(cli.config.as_deref());
    let cwd = PathBuf::from(".");

    match cli.command {
        Commands::Info { file, page } => {
            let viewer = open_viewer(&file, page, settings, &cwd)?;
            let ctx = viewer.document().page();
            let output = InfoOutput {
                path: file.display().to_string(),
                pages: ctx.pages_count,
                page: ctx.page_number + 1,
                width: ctx.page_width,
                height: ctx.page_height,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Line {
            file,
            page,
            x,
            y,
            insert,
        } => {
            let mut viewer = open_viewer(&file, page, settings, &cwd)?;
            viewer.pointer_move(x, y)?;
            print_selection(&viewer)?;
            if insert && !viewer.selection().is_empty() {
                viewer.pointer_down(x, y)?;
                viewer.pointer_up(x, y)?;
            }
        }

        Commands::Text {
            file,
            page,
            region,
            insert,
        } => {
            let mut viewer = open_viewer(&file, page, settings, &cwd)?;
            drag(&mut viewer, &region)?;
            print_selection(&viewer)?;
            if insert && !viewer.selection().is_empty() {
                click_selection(&mut viewer)?;
            }
        }

        Commands::Image {
            file,
            page,
            region,
            attachments,
            pin_zoom,
        } => {
            let mut viewer = open_viewer(&file, page, settings, &attachments)?;
            if let Some(percent) = pin_zoom {
                viewer.set_zoom(ZoomSetting::Percent(percent));
                viewer.pin_image_scale();
                viewer.set_zoom(ZoomSetting::Percent(100.0));
            }
            viewer.switch_mode(SelectionMode::Image);
            drag(&mut viewer, &region)?;
            click_selection(&mut viewer)?;
        }

        Commands::Render {
            file,
            page,
            zoom,
            width,
            region,
            output,
        } => {
            let mut viewer = open_viewer(&file, page, settings, &cwd)?;
            viewer.set_zoom(zoom.unwrap_or(ZoomSetting::FitWidth));
            viewer.resize(width);

            if let Some(region) = region {
                let scale = viewer.view().scale;
                drag(&mut viewer, &region.scaled(scale))?;
            }

            let surface = viewer.render()?;
            surface
                .save_with_format(&output, image::ImageFormat::Png)
                .with_context(|| format!("Failed to write {output:?}"))?;
            info!("Page written to {output:?}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    panic_handler::initialize_panic_handler();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    info!("Starting pdfnotes");

    run(cli)
}
