use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::codec::{self, MapDecoder, MapFormat};
use crate::error::{Error, Result};
use crate::find::PathResult;
use crate::grid::{GridGraph, PixelGrid};

/// How many bytes to hand the streaming decoder at a time when reading a
/// binary map from disk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Extract the flat pixel buffer from a decoded image.
pub fn parse_img(img: &DynamicImage) -> Result<PixelGrid> {
    let width = img.width() as usize;
    let height = img.height() as usize;

    match img {
        DynamicImage::ImageRgb8(buf) => PixelGrid::new(buf.as_raw().clone(), width, height, false),
        DynamicImage::ImageRgba8(buf) => PixelGrid::new(buf.as_raw().clone(), width, height, true),
        other => PixelGrid::new(other.to_rgb8().into_raw(), width, height, false),
    }
}

/// Build the graph straight from a decoded image.
pub fn graph_from_image(img: &DynamicImage, forbidden: [u8; 3]) -> Result<GridGraph> {
    let grid = parse_img(img)?;
    Ok(GridGraph::from_pixels(&grid, forbidden))
}

/// Load a graph from any recognized map source, dispatching on the leading
/// signature bytes: bitmap images are re-derived through the color filter,
/// text and binary maps are decoded directly.
pub fn load_graph<P: AsRef<Path>>(path: P, forbidden: [u8; 3]) -> Result<GridGraph> {
    let path = path.as_ref();

    let mut header = [0u8; 3];
    {
        let mut file = File::open(path)?;
        let mut read = 0;
        while read < header.len() {
            let n = file.read(&mut header[read..])?;
            if n == 0 {
                break;
            }
            read += n;
        }
        if read < header.len() {
            return Err(Error::InvalidFormat(
                "file is too short to carry a map signature".into(),
            ));
        }
    }

    match MapFormat::sniff(&header)? {
        MapFormat::Bitmap => {
            log::info!("deriving graph from image {}", path.display());
            let img = image::open(path)?;
            graph_from_image(&img, forbidden)
        }
        MapFormat::TextMap => {
            log::info!("reading text map {}", path.display());
            codec::decode_hmap(BufReader::new(File::open(path)?))
        }
        MapFormat::BinaryMap => {
            log::info!("reading binary map {}", path.display());
            let mut file = File::open(path)?;
            let mut decoder = MapDecoder::new();
            let mut chunk = vec![0u8; CHUNK_SIZE];
            loop {
                let n = file.read(&mut chunk)?;
                if n == 0 {
                    break;
                }
                decoder.feed(&chunk[..n])?;
            }
            decoder.finish()
        }
    }
}

/// Write the binary map rendition of a graph to disk.
pub fn save_map<P: AsRef<Path>>(graph: &GridGraph, path: P) -> Result<()> {
    codec::encode_map(graph, BufWriter::new(File::create(path)?))
}

/// Write the text map rendition of a graph to disk.
pub fn save_hmap<P: AsRef<Path>>(graph: &GridGraph, path: P) -> Result<()> {
    codec::encode_hmap(graph, BufWriter::new(File::create(path)?))
}

/// Paint a traced path onto an image, one pixel per step. Rendering stays
/// outside the engine; this helper is for tools that want to eyeball a
/// result.
pub fn stamp_path(image: &mut RgbImage, result: &PathResult, color: [u8; 3]) {
    for point in &result.path {
        if point.x < image.width() as usize && point.y < image.height() as usize {
            image.put_pixel(point.x as u32, point.y as u32, image::Rgb(color));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::find::{shortest_path, PathFinderState};
    use crate::grid::Point;

    const BLACK: [u8; 3] = [0, 0, 0];

    fn checkerboard_image(side: u32) -> DynamicImage {
        let img = RgbImage::from_fn(side, side, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([200, 200, 200])
            } else {
                image::Rgb([180, 180, 180])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_parse_img_geometry() {
        let grid = parse_img(&checkerboard_image(4)).unwrap();
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.size(), 16);
    }

    #[test]
    fn test_graph_from_image() {
        let graph = graph_from_image(&checkerboard_image(3), BLACK).unwrap();
        // no pixel matches the forbidden color, so every position is a vertex
        assert_eq!(graph.vertex_count(), 9);
    }

    #[test]
    fn test_map_file_round_trip() {
        let graph = graph_from_image(&checkerboard_image(4), BLACK).unwrap();

        let dir = std::env::temp_dir();
        let map_path = dir.join("maptrace_test_round_trip.map");
        let hmap_path = dir.join("maptrace_test_round_trip.hmap");

        save_map(&graph, &map_path).unwrap();
        save_hmap(&graph, &hmap_path).unwrap();

        assert_eq!(load_graph(&map_path, BLACK).unwrap(), graph);
        assert_eq!(load_graph(&hmap_path, BLACK).unwrap(), graph);

        let _ = std::fs::remove_file(map_path);
        let _ = std::fs::remove_file(hmap_path);
    }

    #[test]
    fn test_stamp_path() {
        let img = checkerboard_image(3);
        let graph = graph_from_image(&img, BLACK).unwrap();

        let state =
            shortest_path(&graph, Point { x: 0, y: 0 }, Point { x: 2, y: 2 }).unwrap();
        let result = match state {
            PathFinderState::PathFound(result) => result,
            other => panic!("expected a path, got {:?}", other),
        };

        let mut canvas = img.to_rgb8();
        stamp_path(&mut canvas, &result, [255, 0, 0]);

        assert_eq!(canvas.get_pixel(0, 0), &image::Rgb([255, 0, 0]));
        assert_eq!(canvas.get_pixel(2, 2), &image::Rgb([255, 0, 0]));
    }
}
