use guidenav::active_section::{ActiveSectionTracker, DetectionBand, VisibilityBatch, VisibilityEntry};
use guidenav::content::GuideContent;
use guidenav::heading_index::{HeadingLevel, IndexOptions, index_headings};
use guidenav::layout::ContentLayout;

const SEATTLE: &str = r#"<html>
<head><title>Seattle Guide</title></head>
<body>
  <nav><h2>Site menu</h2></nav>
  <article>
    <h2 id="getting-there">Getting There</h2>
    <p>Link light rail runs from the airport to Stadium station.</p>
    <h3>From SeaTac</h3>
    <p>About forty minutes.</p>
    <h2>Where to Stay</h2>
    <p>Pioneer Square is walking distance from Lumen Field.</p>
    <h2>   </h2>
    <p>Untitled block.</p>
  </article>
</body>
</html>"#;

#[test]
fn test_guide_page_outline() {
    let mut content = GuideContent::from_html(SEATTLE);
    let outline = index_headings(&mut content.headings, &IndexOptions::default());

    let ids: Vec<&str> = outline.ids().collect();
    assert_eq!(
        ids,
        vec!["getting-there", "from-seatac", "where-to-stay", "section-4"]
    );
    assert_eq!(outline.get(1).map(|e| e.level), Some(HeadingLevel::Secondary));
    assert_eq!(outline.get(3).map(|e| e.label.as_str()), Some("Section 4"));

    // Ids are written back onto the headings themselves
    assert_eq!(content.headings[2].id(), Some("where-to-stay"));
    assert_eq!(content.title.as_deref(), Some("Seattle Guide"));
}

#[test]
fn test_duplicate_and_empty_headings() {
    let html = "<article><h2>Overview</h2><h2>Overview</h2><h3></h3></article>";
    let mut content = GuideContent::from_html(html);
    let outline = index_headings(&mut content.headings, &IndexOptions::default());

    let ids: Vec<&str> = outline.ids().collect();
    assert_eq!(ids, vec!["overview", "overview-1", "section-3"]);
}

#[test]
fn test_reindexing_is_stable() {
    let mut content = GuideContent::from_html(SEATTLE);
    let first = index_headings(&mut content.headings, &IndexOptions::default());
    let second = index_headings(&mut content.headings, &IndexOptions::default());
    assert_eq!(first, second);
}

#[test]
fn test_tie_between_fully_visible_sections_picks_document_order() {
    let mut content = GuideContent::from_html(SEATTLE);
    let outline = index_headings(&mut content.headings, &IndexOptions::default());
    let mut tracker = ActiveSectionTracker::new();
    let _observer = tracker.attach(&outline, &[], DetectionBand::default());

    let batch = VisibilityBatch {
        generation: 1,
        entries: vec![
            VisibilityEntry {
                id: "where-to-stay".to_string(),
                position: 2,
                is_intersecting: true,
                intersection_ratio: 1.0,
            },
            VisibilityEntry {
                id: "from-seatac".to_string(),
                position: 1,
                is_intersecting: true,
                intersection_ratio: 1.0,
            },
        ],
    };
    assert!(tracker.apply(&batch));
    assert_eq!(tracker.active_id(), Some("from-seatac"));
}

#[test]
fn test_observer_follows_scrolling() {
    let mut content = GuideContent::from_html(&{
        let mut html = String::from("<article>");
        for s in 1..=4 {
            html.push_str(&format!("<h2>Stop {s}</h2>"));
            for _ in 0..10 {
                html.push_str("<p>Match day notes.</p>");
            }
        }
        html.push_str("</article>");
        html
    });
    let outline = index_headings(&mut content.headings, &IndexOptions::default());
    let layout = ContentLayout::build(&content, 60);

    let mut tracker = ActiveSectionTracker::new();
    let mut observer = tracker.attach(&outline, &layout.heading_spans, DetectionBand::default());
    assert_eq!(tracker.active_id(), Some("stop-1"));

    let stop_3 = layout.heading_span(2).map(|span| span.start).unwrap();
    tracker.apply(&observer.measure(stop_3, 20));
    assert_eq!(tracker.active_id(), Some("stop-3"));

    // Scrolling into the body of a section where no heading is in the band keeps it active
    tracker.apply(&observer.measure(stop_3 + 2, 20));
    assert_eq!(tracker.active_id(), Some("stop-3"));
}

#[test]
fn test_batch_after_unmount_is_ignored() {
    let mut content = GuideContent::from_html(SEATTLE);
    let outline = index_headings(&mut content.headings, &IndexOptions::default());
    let layout = ContentLayout::build(&content, 60);

    let mut tracker = ActiveSectionTracker::new();
    let mut observer = tracker.attach(&outline, &layout.heading_spans, DetectionBand::default());
    tracker.detach();

    let late = observer.measure(0, 20);
    assert!(!tracker.apply(&late));
    assert_eq!(tracker.active_id(), None);
    assert!(!tracker.is_attached());
}

#[test]
fn test_demo_guide_loads_from_disk() {
    use guidenav::App;
    use guidenav::test_utils::test_helpers::test_settings;
    use std::path::Path;

    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/seattle.html");
    let mut app = App::ephemeral(test_settings());
    app.load_guide(&path, None).unwrap();

    assert_eq!(app.page_key(), Some("/guide/seattle"));
    let ids: Vec<&str> = app.outline().ids().collect();
    assert_eq!(
        ids,
        vec![
            "getting-there",
            "from-sea-tac-airport",
            "ferries-and-water-taxis",
            "where-to-stay",
            "where-to-stay-4",
            "fan-zones",
            "watch-parties",
            "food-and-drink",
            "section-9",
        ]
    );
    assert_eq!(app.active_id(), Some("getting-there"));
}

#[test]
fn test_missing_guide_file_is_an_error() {
    use guidenav::App;
    use guidenav::test_utils::test_helpers::test_settings;
    use std::path::Path;

    let mut app = App::ephemeral(test_settings());
    assert!(app.load_guide(Path::new("/nonexistent/guide.html"), None).is_err());
    assert!(!app.is_mounted());
}
