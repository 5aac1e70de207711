use anyhow::Result;
use rowflow::testing::{byte_source, drain_to_string, DoubledCount, Label, PositiveCount, WordCount};
use rowflow::{json_lines, ReduceStage, Stage};

#[test]
fn adjacent_equal_keys_fold_into_one_group() -> Result<()> {
    let input = "{\"key\":\"test\",\"value\":1}\n{\"key\":\"test\",\"value\":1}\n";
    let stage = ReduceStage::new(json_lines::<WordCount>()).feed(byte_source(input));
    assert_eq!(drain_to_string(stage)?, "test\t2\n");
    Ok(())
}

#[test]
fn finalize_runs_once_per_group_after_summing() -> Result<()> {
    let input = "{\"key\":\"test\",\"value\":1}\n{\"key\":\"test\",\"value\":1}\n";
    let stage = ReduceStage::new(json_lines::<DoubledCount>()).feed(byte_source(input));
    assert_eq!(drain_to_string(stage)?, "test\t4\n");
    Ok(())
}

#[test]
fn non_adjacent_equal_keys_form_separate_groups() -> Result<()> {
    let input = concat!(
        "{\"key\":\"a\",\"value\":1}\n",
        "{\"key\":\"b\",\"value\":2}\n",
        "{\"key\":\"a\",\"value\":3}\n",
    );
    let stage = ReduceStage::new(json_lines::<WordCount>()).feed(byte_source(input));
    assert_eq!(drain_to_string(stage)?, "a\t1\nb\t2\na\t3\n");
    Ok(())
}

#[test]
fn key_change_closes_the_open_group() -> Result<()> {
    let input = concat!(
        "{\"key\":\"a\",\"value\":1}\n",
        "{\"key\":\"a\",\"value\":2}\n",
        "{\"key\":\"b\",\"value\":5}\n",
    );
    let stage = ReduceStage::new(json_lines::<WordCount>()).feed(byte_source(input));
    assert_eq!(drain_to_string(stage)?, "a\t3\nb\t5\n");
    Ok(())
}

#[test]
fn records_without_sum_keep_the_first_of_a_run() -> Result<()> {
    let input = concat!(
        "{\"key\":\"a\",\"value\":\"first\"}\n",
        "{\"key\":\"a\",\"value\":\"second\"}\n",
        "{\"key\":\"b\",\"value\":\"only\"}\n",
    );
    let stage = ReduceStage::new(json_lines::<Label>()).feed(byte_source(input));
    assert_eq!(drain_to_string(stage)?, "a\tfirst\nb\tonly\n");
    Ok(())
}

#[test]
fn filtered_records_do_not_split_a_group() -> Result<()> {
    let input = concat!(
        "{\"key\":\"a\",\"value\":1}\n",
        "{\"key\":\"skip\",\"value\":0}\n",
        "{\"key\":\"a\",\"value\":2}\n",
    );
    let stage = ReduceStage::new(json_lines::<PositiveCount>()).feed(byte_source(input));
    assert_eq!(drain_to_string(stage)?, "a\t3\n");
    Ok(())
}

#[test]
fn terminal_group_is_finalized_at_exhaustion() -> Result<()> {
    let input = "{\"key\":\"last\",\"value\":9}\n";
    let stage = ReduceStage::new(json_lines::<DoubledCount>()).feed(byte_source(input));
    assert_eq!(drain_to_string(stage)?, "last\t18\n");
    Ok(())
}

#[test]
fn reduce_empty_input_emits_nothing() -> Result<()> {
    let stage = ReduceStage::new(json_lines::<WordCount>()).feed(byte_source(""));
    assert_eq!(drain_to_string(stage)?, "");
    Ok(())
}
