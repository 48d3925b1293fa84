use anyhow::{bail, Context};
use maptrace::{shortest_path, util, PathFinderState, Point};

struct Args {
    source: String,
    from: Point,
    to: Point,
    forbidden: [u8; 3],
    save_map: Option<String>,
    save_hmap: Option<String>,
    stamp: Option<String>,
}

const USAGE: &str = "usage: maptrace <map-or-image> <from-x> <from-y> <to-x> <to-y> \
    [--forbidden R,G,B] [--save-map FILE] [--save-hmap FILE] [--stamp FILE]";

fn parse_args() -> anyhow::Result<Args> {
    let mut positional = Vec::new();
    let mut forbidden = [0, 0, 0];
    let mut save_map = None;
    let mut save_hmap = None;
    let mut stamp = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--forbidden" => {
                let value = args.next().context("--forbidden takes a R,G,B value")?;
                let parts: Vec<&str> = value.split(',').collect();
                if parts.len() != 3 {
                    bail!("--forbidden takes three comma-separated channel values");
                }
                for (slot, part) in forbidden.iter_mut().zip(&parts) {
                    *slot = part
                        .trim()
                        .parse()
                        .with_context(|| format!("invalid channel value '{}'", part))?;
                }
            }
            "--save-map" => save_map = Some(args.next().context("--save-map takes a path")?),
            "--save-hmap" => save_hmap = Some(args.next().context("--save-hmap takes a path")?),
            "--stamp" => stamp = Some(args.next().context("--stamp takes a path")?),
            _ => positional.push(arg),
        }
    }

    if positional.len() != 5 {
        bail!("{}", USAGE);
    }

    let coord = |s: &String| -> anyhow::Result<usize> {
        s.parse().with_context(|| format!("invalid coordinate '{}'", s))
    };

    Ok(Args {
        from: Point {
            x: coord(&positional[1])?,
            y: coord(&positional[2])?,
        },
        to: Point {
            x: coord(&positional[3])?,
            y: coord(&positional[4])?,
        },
        source: positional.swap_remove(0),
        forbidden,
        save_map,
        save_hmap,
        stamp,
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = parse_args()?;

    let graph = util::load_graph(&args.source, args.forbidden)
        .with_context(|| format!("failed to load map source '{}'", args.source))?;
    println!(
        "loaded {}x{} map with {} vertices",
        graph.width(),
        graph.height(),
        graph.vertex_count()
    );

    if let Some(path) = &args.save_map {
        util::save_map(&graph, path).with_context(|| format!("failed to write '{}'", path))?;
        println!("wrote binary map to {}", path);
    }
    if let Some(path) = &args.save_hmap {
        util::save_hmap(&graph, path).with_context(|| format!("failed to write '{}'", path))?;
        println!("wrote text map to {}", path);
    }

    match shortest_path(&graph, args.from, args.to)? {
        PathFinderState::PathFound(result) => {
            println!(
                "path {} -> {}: {} steps, total cost {}",
                result.start,
                result.goal,
                result.path.len(),
                result.total_cost
            );
            for point in &result.path {
                println!("  {}", point);
            }

            if let Some(out) = &args.stamp {
                let img = image::open(&args.source)
                    .context("stamping a path requires an image source")?;
                let mut canvas = img.to_rgb8();
                util::stamp_path(&mut canvas, &result, [255, 0, 0]);
                canvas
                    .save(out)
                    .with_context(|| format!("failed to write '{}'", out))?;
                println!("stamped path onto {}", out);
            }
        }
        PathFinderState::NoPathFound => {
            println!("no path between {} and {}", args.from, args.to);
        }
        PathFinderState::Computing => bail!("query ended before completing"),
    }

    Ok(())
}
