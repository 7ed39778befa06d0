//! End-to-end tests for the entry extraction pipeline on synthetic volumes.

use ecb_core::{ConfigFile, YearRecord, YearTable};
use ecb_parsing::{
    BoundaryMode, BoundaryStrategy, DefectClassifier, Entry, FuzzyLocator, FuzzyParams,
    ParsingConfigBuilder, TerminatorMatcher, VolumeExtractor,
};
use ecb_parsing::{Defect, PageSegmenter, split_document};

const CONFIG: &str = r#"
[defaults]
front_marker = 'centimetres.\n.*\n'
appendix_marker = 'WITH LISTS OF THEIR\nPUBLICATIONS, 19{year}'

[years."08"]
year_tokens = ["1908", "I908"]
"#;

fn record() -> YearRecord {
    let config: ConfigFile = toml::from_str(CONFIG).unwrap();
    YearTable::from_config(&config).unwrap().record("08").unwrap()
}

/// Two body pages, three well-formed entries, front matter on two scan pages.
fn two_page_volume() -> String {
    [
        "THE ENGLISH CATALOGUE\nOF BOOKS\x0cPREFACE\nSizes are given in centimetres.\nKEY\n",
        "Smith (John) A History of the Parish. 8vo, 5s. LONGMANS, Jan. 1908.\n",
        "Jones (Mary) Verses and Songs. 12mo, 2s. MURRAY, Feb. I908.\n",
        "\x0cTHE ENGLISH CATALOGUE\n1908\n",
        "Brown (T.) Sketches of Rural Life. 8vo, 6s. ARNOLD, Mar. 1908.\n",
        "WITH LISTS OF THEIR\nPUBLICATIONS, 1908\nAbbey Press, 12 Strand.\n",
    ]
    .concat()
}

#[test]
fn two_page_volume_yields_three_clean_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ecb_1908.txt");
    std::fs::write(&path, two_page_volume()).unwrap();

    let result = VolumeExtractor::new().extract_file(&path, &record()).unwrap();

    let clean: Vec<&Entry> = result.clean().collect();
    assert_eq!(clean.len(), 3, "entries: {:#?}", result.entries);
    assert_eq!(
        clean.iter().map(|e| e.page).collect::<Vec<_>>(),
        vec![Some(1), Some(1), Some(2)]
    );
    // front matter spans two scan pages, so body page 1 is scan page 2
    assert_eq!(clean[0].doc_page, Some(2));
    assert!(result.line_mid.is_empty());
}

#[test]
fn invalid_bytes_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ecb_1908.txt");
    let mut bytes = two_page_volume().into_bytes();
    bytes.splice(0..0, [0xff, 0xfe]);
    std::fs::write(&path, bytes).unwrap();

    let result = VolumeExtractor::new().extract_file(&path, &record()).unwrap();
    assert_eq!(result.clean().count(), 3);
}

#[test]
fn crlf_dump_reads_like_lf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ecb_1908.txt");
    std::fs::write(&path, two_page_volume().replace('\n', "\r\n")).unwrap();

    let result = VolumeExtractor::new().extract_file(&path, &record()).unwrap();
    let clean: Vec<&str> = result.clean().map(|e| e.text.as_str()).collect();
    assert_eq!(
        clean,
        vec![
            "Smith (John) A History of the Parish. 8vo, 5s. LONGMANS, Jan. 1908.",
            "Jones (Mary) Verses and Songs. 12mo, 2s. MURRAY, Feb. I908.",
            "Brown (T.) Sketches of Rural Life. 8vo, 6s. ARNOLD, Mar. 1908.",
        ]
    );
    assert!(result.entries.iter().all(|e| !e.text.contains('\r')));
}

#[test]
fn missing_file_is_io_error() {
    let err = VolumeExtractor::new()
        .extract_file(std::path::Path::new("/nonexistent/ecb_1908.txt"), &record())
        .unwrap_err();
    assert!(matches!(err, ecb_core::ExtractError::Io { .. }), "{}", err);
}

#[test]
fn exact_slices_partition_every_page() {
    let record = record();
    let text = two_page_volume();
    let parts = split_document(&text, &record).unwrap();
    let pages = PageSegmenter::new("08", &ecb_parsing::ParsingConfig::default().header_patterns())
        .unwrap()
        .segment(parts.body, parts.doc_page_delta);
    let matcher = TerminatorMatcher::new(&record.year_tokens).unwrap();

    for page in &pages {
        let entries = matcher.segment(std::slice::from_ref(page));
        let rebuilt: String = entries
            .iter()
            .map(|e| &page.text[e.span.clone().unwrap()])
            .collect();
        assert_eq!(rebuilt, page.text, "page {} not partitioned", page.number());
    }
}

#[test]
fn fuzzy_slices_partition_every_page() {
    let locator = FuzzyLocator::new("08", FuzzyParams::default());
    let page = ecb_core::Page::new(
        0,
        "Smith (J.) Poems. 8vo, 5s. LONGMANS, Jan 08.\nJones (M.) Verses. MURRAY, Fcb. 08\nGreen (A.) Tales.",
    );
    let entries = locator.segment(std::slice::from_ref(&page));
    assert!(entries.len() >= 2, "{:#?}", entries);
    let rebuilt: String = entries
        .iter()
        .map(|e| &page.text[e.span.clone().unwrap()])
        .collect();
    assert_eq!(rebuilt, page.text);
}

fn body_pages() -> Vec<ecb_core::Page> {
    let record = record();
    let text = two_page_volume();
    let parts = split_document(&text, &record).unwrap();
    PageSegmenter::new("08", &ecb_parsing::ParsingConfig::default().header_patterns())
        .unwrap()
        .segment(parts.body, parts.doc_page_delta)
}

#[test]
fn fuzzy_cutoffs_follow_each_date() {
    let locator = FuzzyLocator::new("08", FuzzyParams::default());
    let pages = body_pages();
    assert_eq!(pages.len(), 2);

    let offsets = |page: &ecb_core::Page| -> Vec<usize> {
        locator.locate(page).iter().map(|c| c.offset).collect()
    };
    // each cut falls right after the year, before its closing period
    assert_eq!(offsets(&pages[0]), vec![66, 126]);
    assert!(pages[0].text[..66].ends_with("Jan. 1908"));
    assert!(pages[0].text[..126].ends_with("Feb. I908"));
    assert_eq!(offsets(&pages[1]), vec![61]);
    assert!(pages[1].text[..61].ends_with("Mar. 1908"));

    for page in &pages {
        let entries = locator.segment(std::slice::from_ref(page));
        let rebuilt: String = entries
            .iter()
            .map(|e| &page.text[e.span.clone().unwrap()])
            .collect();
        assert_eq!(rebuilt, page.text, "page {} not partitioned", page.number());
    }
}

#[test]
fn fuzzy_strategy_recovers_every_entry() {
    let config = ParsingConfigBuilder::new()
        .strategy(BoundaryMode::Fuzzy)
        .build()
        .unwrap();
    let volume = ecb_core::Volume::new("08", two_page_volume(), record().year_tokens);
    let result = VolumeExtractor::with_config(config)
        .extract(&volume, &record())
        .unwrap();

    assert_eq!(result.strategy, BoundaryMode::Fuzzy);
    let texts: Vec<&str> = result.entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Smith (John) A History of the Parish. 8vo, 5s. LONGMANS, Jan. 1908",
            ". Jones (Mary) Verses and Songs. 12mo, 2s. MURRAY, Feb. I908",
            ".",
            "Brown (T.) Sketches of Rural Life. 8vo, 6s. ARNOLD, Mar. 1908",
            ".",
        ]
    );
    assert_eq!(result.entries.iter().filter(|e| e.main_entry).count(), 3);
    assert_eq!(result.clean().count(), 2);
    // the carried-over period leaves the middle entry uncapitalized
    assert!(result.entries[1].has(Defect::NotCapitalized));
    assert!(result.line_mid.is_empty());
}

#[test]
fn line_mid_entry_is_split_in_pipeline() {
    let text = [
        "front centimetres.\nkey\n",
        "Smith, J. Some Title. Dec. 08 More stuff. London: Publisher, Jan. 1908.\n",
        "WITH LISTS OF THEIR\nPUBLICATIONS, 1908\n",
    ]
    .concat();
    let volume = ecb_core::Volume::new("08", text, record().year_tokens);
    let result = VolumeExtractor::new().extract(&volume, &record()).unwrap();

    assert_eq!(result.line_mid.len(), 1);
    assert_eq!(result.entries_before_correction, 2);
    let texts: Vec<&str> = result.entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(
        &texts[..2],
        &[
            "Smith, J. Some Title. Dec. 08",
            "More stuff. London: Publisher, Jan. 1908.",
        ]
    );
    assert!(!result.entries[1].has(Defect::LineMid));
    assert_eq!(result.metrics().line_mid, 1);
}

#[test]
fn classification_is_idempotent_over_a_volume() {
    let volume = ecb_core::Volume::new("08", two_page_volume(), record().year_tokens);
    let result = VolumeExtractor::new().extract(&volume, &record()).unwrap();

    let classifier = DefectClassifier::new("08", &volume.year_tokens, 25).unwrap();
    let mut again = result.entries.clone();
    classifier.classify_all(&mut again);
    assert_eq!(again, result.entries);
}
