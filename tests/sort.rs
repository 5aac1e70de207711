use anyhow::Result;
use rowflow::testing::{byte_source, drain_to_string, tab_counts, Label, WordCount};
use rowflow::{json_lines, ReduceStage, SortStage, Stage};
use std::collections::HashMap;

#[test]
fn sort_orders_by_key() -> Result<()> {
    let input = "{\"key\":\"B\",\"value\":1}\n{\"key\":\"A\",\"value\":1}\n";
    let stage = SortStage::new(json_lines::<WordCount>()).feed(byte_source(input));
    assert_eq!(drain_to_string(stage)?, "A\t1\nB\t1\n");
    Ok(())
}

#[test]
fn sort_is_stable_for_equal_keys() -> Result<()> {
    let input = concat!(
        "{\"key\":\"k\",\"value\":\"first\"}\n",
        "{\"key\":\"a\",\"value\":\"solo\"}\n",
        "{\"key\":\"k\",\"value\":\"second\"}\n",
        "{\"key\":\"k\",\"value\":\"third\"}\n",
    );
    let stage = SortStage::new(json_lines::<Label>()).feed(byte_source(input));
    assert_eq!(
        drain_to_string(stage)?,
        "a\tsolo\nk\tfirst\nk\tsecond\nk\tthird\n"
    );
    Ok(())
}

#[test]
fn sort_restores_the_adjacency_reduce_depends_on() -> Result<()> {
    // Permuted duplicate keys: sort followed by reduce must agree with a
    // reference hash-based group-by.
    let pairs = [
        ("pear", 4u64),
        ("apple", 1),
        ("fig", 7),
        ("apple", 2),
        ("pear", 1),
        ("apple", 5),
        ("fig", 3),
    ];
    let input: String = pairs
        .iter()
        .map(|(k, v)| format!("{{\"key\":\"{k}\",\"value\":{v}}}\n"))
        .collect();

    let mut reference: HashMap<&str, u64> = HashMap::new();
    for (k, v) in pairs {
        *reference.entry(k).or_insert(0) += v;
    }

    let out = drain_to_string(
        SortStage::new(json_lines::<WordCount>())
            .feed(byte_source(&input))
            .then(ReduceStage::new(tab_counts())),
    )?;

    let mut grouped: HashMap<&str, u64> = HashMap::new();
    for line in out.lines() {
        let (k, v) = line.split_once('\t').expect("malformed output line");
        // One line per distinct key once sorted.
        assert!(grouped.insert(k, v.parse()?).is_none(), "duplicate group {k}");
    }
    assert_eq!(grouped, reference);
    Ok(())
}
