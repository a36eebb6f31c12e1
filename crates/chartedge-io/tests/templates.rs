//! Integration test: resolve templates from scratch directories and run
//! them through the pipeline.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chartedge_io::{
    CandidateRoot, Outcome, ServiceError, SourceResolver, process_image_file,
    process_template_image,
};
use chartedge_pipeline::TechniqueConfig;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Fresh, empty scratch directory under the cargo target tree.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("chartedge-io").join(name);
    if dir.exists() {
        std::fs::remove_dir_all(&dir).unwrap();
    }
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn chart_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        if x > width / 3 && x < width / 2 && y > height / 4 {
            image::Rgb([200, 40, 40])
        } else {
            image::Rgb([255, 255, 255])
        }
    });
    let mut buf = Vec::new();
    image::ImageEncoder::write_image(
        image::codecs::png::PngEncoder::new(&mut buf),
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgb8,
    )
    .unwrap();
    buf
}

/// Every file under `dir` with its contents.
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let bytes = std::fs::read(&path).unwrap();
                files.insert(path, bytes);
            }
        }
    }
    files
}

fn two_root_resolver(base: &Path) -> SourceResolver {
    let first = base.join("public");
    let second = base.join("backend");
    std::fs::create_dir_all(&first).unwrap();
    std::fs::create_dir_all(&second).unwrap();
    SourceResolver::new(vec![
        CandidateRoot::Absolute(first),
        CandidateRoot::Absolute(second),
    ])
}

#[test]
fn template_in_second_root_resolves_without_writing() {
    init_logger();
    let base = scratch_dir("second-root");
    let resolver = two_root_resolver(&base);
    std::fs::write(base.join("backend/bar.png"), chart_png(300, 200)).unwrap();
    let before = snapshot(&base);

    let path = resolver.resolve("bar.png").unwrap();
    assert_eq!(path, base.join("backend/bar.png"));
    assert!(path.is_absolute());

    let config = TechniqueConfig::from_json(r#"{"threshold": {"lower": 30, "upper": 90}}"#).unwrap();
    let bundle = process_template_image(&resolver, "bar.png", Some(&config)).unwrap();
    assert!(bundle.contains("processed_edges.threshold"));
    assert!(bundle.contains("top_edge_image"));
    assert_eq!(bundle.dimensions().width, 768);

    assert_eq!(snapshot(&base), before, "resolution must not touch the filesystem");
}

#[test]
fn first_root_wins_when_both_hold_the_file() {
    init_logger();
    let base = scratch_dir("first-wins");
    let resolver = two_root_resolver(&base);
    std::fs::write(base.join("public/line.png"), chart_png(100, 100)).unwrap();
    std::fs::write(base.join("backend/line.png"), chart_png(200, 100)).unwrap();

    assert_eq!(
        resolver.resolve("line.png").unwrap(),
        base.join("public/line.png")
    );
    let bundle = process_template_image(&resolver, "line.png", None).unwrap();
    assert_eq!(bundle.dimensions().width, 512);
}

#[test]
fn missing_template_lists_every_candidate() {
    init_logger();
    let base = scratch_dir("missing");
    let resolver = two_root_resolver(&base);

    let err = process_template_image(&resolver, "pie.png", None).unwrap_err();
    assert_eq!(err.outcome(), Outcome::NotFound);
    match err {
        ServiceError::SourceNotFound {
            filename,
            candidates,
        } => {
            assert_eq!(filename, "pie.png");
            assert_eq!(
                candidates,
                [base.join("public/pie.png"), base.join("backend/pie.png")]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn directory_with_template_name_is_not_a_match() {
    init_logger();
    let base = scratch_dir("dir-named");
    let resolver = two_root_resolver(&base);
    std::fs::create_dir_all(base.join("public/area.png")).unwrap();
    std::fs::write(base.join("backend/area.png"), chart_png(50, 50)).unwrap();
    assert_eq!(
        resolver.resolve("area.png").unwrap(),
        base.join("backend/area.png")
    );
}

#[test]
fn traversal_is_rejected_before_lookup() {
    init_logger();
    let base = scratch_dir("traversal");
    let resolver = two_root_resolver(&base);
    std::fs::write(base.join("secret.png"), chart_png(10, 10)).unwrap();

    for name in ["../secret.png", "", "public/../secret.png"] {
        let err = process_template_image(&resolver, name, None).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidFilename(_)), "{name}");
        assert_eq!(err.outcome(), Outcome::BadInput);
    }
}

#[test]
fn undecodable_template_is_bad_input() {
    init_logger();
    let base = scratch_dir("corrupt");
    let resolver = two_root_resolver(&base);
    std::fs::write(base.join("public/broken.png"), b"not a png").unwrap();

    let err = process_template_image(&resolver, "broken.png", None).unwrap_err();
    assert!(matches!(err, ServiceError::Pipeline(_)));
    assert_eq!(err.outcome(), Outcome::BadInput);
}

#[test]
fn uploaded_file_gets_baseline_bundle() {
    init_logger();
    let base = scratch_dir("upload");
    let path = base.join("upload.png");
    std::fs::write(&path, chart_png(300, 200)).unwrap();

    let bundle = process_image_file(&path).unwrap();
    assert_eq!(bundle.key_names(), ["grayscale_image", "edge_image"]);

    let err = process_image_file(&base.join("absent.png")).unwrap_err();
    assert!(matches!(err, ServiceError::Read { .. }));
    assert_eq!(err.outcome(), Outcome::Internal);
}
