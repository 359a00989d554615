use std::path::PathBuf;

use clap::{value_parser, Arg, ArgMatches, Command};
use lazy_static::lazy_static;
use regex::Regex;

use crate::{Config, RenderKind};

lazy_static! {
    static ref IMG_DIM: Regex = Regex::new(r"^(\d+)x(\d+)$").unwrap();
}

fn parse_dim(s: &str) -> Result<(u32, u32), String> {
    let caps = IMG_DIM
        .captures(s)
        .ok_or_else(|| "expected WxH, e.g. 1280x720".to_string())?;
    let width = caps[1].parse().map_err(|_| "width out of range".to_string())?;
    let height = caps[2].parse().map_err(|_| "height out of range".to_string())?;
    if width == 0 || height == 0 {
        return Err("dimensions must be positive".to_string());
    }
    Ok((width, height))
}

pub fn build_app() -> Command {
    Command::new("rayforge")
        .about("Two-level BVH ray tracer demo")
        .arg(
            Arg::new("dimensions")
                .short('d')
                .long("dim")
                .value_name("DIM")
                .default_value("1280x720")
                .value_parser(parse_dim)
                .help("Size of the image to render"),
        )
        .arg(
            Arg::new("render")
                .short('r')
                .long("render")
                .value_name("KIND")
                .default_value("shaded")
                .value_parser(["shaded", "depthmap", "heatmap"])
                .help("What to write per pixel"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("out")
                .value_name("FILE")
                .default_value("out.bmp")
                .help("File name for output"),
        )
        .arg(
            Arg::new("iterations")
                .short('n')
                .long("iterations")
                .value_name("N")
                .default_value("1")
                .value_parser(value_parser!(u32).range(1..))
                .help("Samples per pixel for the shaded render"),
        )
        .arg(
            Arg::new("threads")
                .short('j')
                .long("threads")
                .value_name("N")
                .value_parser(value_parser!(u32).range(1..))
                .help("Worker thread count, defaults to all hardware threads"),
        )
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("OBJ file to render; a built-in cube scene is used when absent"),
        )
}

pub fn parse_matches(matches: &ArgMatches) -> Config {
    let &(image_width, image_height) = matches.get_one::<(u32, u32)>("dimensions").unwrap();
    Config {
        input_file: matches.get_one::<String>("input").map(PathBuf::from),
        output_file: PathBuf::from(matches.get_one::<String>("outfile").unwrap()),
        image_width,
        image_height,
        iterations: *matches.get_one::<u32>("iterations").unwrap(),
        num_threads: matches.get_one::<u32>("threads").copied(),
        render_kind: match matches.get_one::<String>("render").unwrap().as_str() {
            "depthmap" => RenderKind::Depthmap,
            "heatmap" => RenderKind::Heatmap,
            _ => RenderKind::Shaded,
        },
    }
}
