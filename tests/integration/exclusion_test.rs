use std::fs;
use strmsync::core::config::CatalogRules;
use strmsync::core::exclusion::{append_to_list, ExclusionSet};
use strmsync::core::manifest::EntryParser;
use tempfile::TempDir;

const MANIFEST: &str = "#EXTM3U
#EXTINF:-1,Foo: Bar (DE)
http://h/movie/u/p/1.mp4
#EXTINF:-1,Night: Shift (DE) S01 E01
http://h/series/u/p/11.mkv
#EXTINF:-1,Night: Shift (DE) S02 E05
http://h/series/u/p/25.mkv
#EXTINF:-1,Other Show (DE) S01 E01
http://h/series/u/p/31.mkv
";

#[test]
fn test_blocked_titles_filter_parsed_entries() {
    let dir = TempDir::new().unwrap();
    let list = dir.path().join("config").join("blocklist.txt");

    assert!(append_to_list(&list, "Night: Shift (DE)").unwrap());
    assert!(append_to_list(&list, "Foo: Bar (DE)").unwrap());
    assert!(!append_to_list(&list, "Night: Shift (DE)").unwrap());
    assert_eq!(
        fs::read_to_string(&list).unwrap(),
        "Night_ Shift (DE)\nFoo_ Bar (DE)\n"
    );

    let rules = CatalogRules::default();
    let parsed = EntryParser::new(&rules).parse(MANIFEST);
    assert_eq!(parsed.entries.len(), 4);

    let set = ExclusionSet::load_from_file(&list).unwrap();
    let (kept, removed) = set.filter(parsed.entries);

    assert_eq!(removed, 3);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].display_title, "Other Show (DE) S01 E01");
}
