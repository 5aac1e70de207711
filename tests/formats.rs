use anyhow::{Context, Result};
use rowflow::testing::{byte_source, drain_to_string, Label, WordCount};
use rowflow::{json_lines, Columnar, Delimited, JsonLines, MapStage, Schema, Stage, Structured};

fn colon_counts()
-> Delimited<WordCount, impl Fn(&[u8]) -> Result<WordCount> + Send + Clone + 'static> {
    Delimited::new(|frame: &[u8]| {
        let text = std::str::from_utf8(frame)?;
        let (key, value) = text.split_once(':').context("missing ':'")?;
        Ok(WordCount {
            key: key.to_string(),
            value: value.parse()?,
        })
    })
}

#[test]
fn delimited_frames_on_newline_and_strips_cr() -> Result<()> {
    let stage = MapStage::new(colon_counts()).feed(byte_source("a:1\r\nb:2\n"));
    assert_eq!(drain_to_string(stage)?, "a\t1\nb\t2\n");
    Ok(())
}

#[test]
fn delimited_delivers_final_unterminated_frame() -> Result<()> {
    let stage = MapStage::new(colon_counts()).feed(byte_source("a:1\nb:2"));
    assert_eq!(drain_to_string(stage)?, "a\t1\nb\t2\n");
    Ok(())
}

#[test]
fn delimited_supports_custom_delimiters() -> Result<()> {
    let format = colon_counts().delimiter(b';');
    let stage = MapStage::new(format).feed(byte_source("a:1;b:2;"));
    assert_eq!(drain_to_string(stage)?, "a\t1\nb\t2\n");
    Ok(())
}

#[test]
fn delimited_parse_error_aborts_the_stage() {
    let stage = MapStage::new(colon_counts()).feed(byte_source("a:1\nnot-a-pair\n"));
    let mut out = Vec::new();
    let err = stage.drain(&mut out).unwrap_err();
    assert!(err.to_string().contains("parse frame 2"), "got: {err:#}");
    // The line emitted before the failure is intact.
    assert_eq!(out, b"a\t1\n");
}

#[test]
fn jsonl_strips_hadoop_key_prefix() -> Result<()> {
    let input = "test\t{\"key\":\"test\",\"value\":1}\n";
    let stage = MapStage::new(json_lines::<WordCount>()).feed(byte_source(input));
    assert_eq!(drain_to_string(stage)?, "test\t1\n");
    Ok(())
}

#[test]
fn jsonl_keep_key_prefix_decodes_whole_lines() -> Result<()> {
    let format =
        Structured::<WordCount, _>::new(JsonLines::default().keep_key_prefix());
    let stage = MapStage::new(format).feed(byte_source("{\"key\":\"k\",\"value\":3}\n"));
    assert_eq!(drain_to_string(stage)?, "k\t3\n");
    Ok(())
}

#[test]
fn jsonl_skips_blank_lines() -> Result<()> {
    let input = "\n{\"key\":\"a\",\"value\":1}\n   \n{\"key\":\"b\",\"value\":2}\n";
    let stage = MapStage::new(json_lines::<WordCount>()).feed(byte_source(input));
    assert_eq!(drain_to_string(stage)?, "a\t1\nb\t2\n");
    Ok(())
}

#[test]
fn jsonl_decode_error_aborts_the_stage() {
    let input = "{\"key\":\"a\",\"value\":1}\n{not json}\n{\"key\":\"b\",\"value\":2}\n";
    let stage = MapStage::new(json_lines::<WordCount>()).feed(byte_source(input));
    let mut out = Vec::new();
    let err = stage.drain(&mut out).unwrap_err();
    assert!(err.to_string().contains("decode frame 2"), "got: {err:#}");
    assert_eq!(out, b"a\t1\n");
}

#[test]
fn jsonl_lenient_skips_undecodable_frames() -> Result<()> {
    let input = "{\"key\":\"a\",\"value\":1}\n{not json}\n{\"key\":\"b\",\"value\":2}\n";
    let stage = MapStage::new(json_lines::<WordCount>().lenient()).feed(byte_source(input));
    assert_eq!(drain_to_string(stage)?, "a\t1\nb\t2\n");
    Ok(())
}

fn visit_schema() -> Schema<Label> {
    Schema::new()
        .column(|r: &mut Label, cell: &str| {
            r.key = cell.to_string();
            Ok(())
        })
        .column(|r: &mut Label, cell: &str| {
            r.value = cell.to_string();
            Ok(())
        })
}

#[test]
fn columnar_populates_fields_positionally() -> Result<()> {
    let stage = Columnar::new(visit_schema());
    let stage = MapStage::new(stage).feed(byte_source("host-a\t12\nhost-b\t7\n"));
    assert_eq!(drain_to_string(stage)?, "host-a\t12\nhost-b\t7\n");
    Ok(())
}

#[test]
fn columnar_short_row_is_a_decode_error() {
    let stage = MapStage::new(Columnar::new(visit_schema())).feed(byte_source("only-one-cell\n"));
    let mut out = Vec::new();
    let err = stage.drain(&mut out).unwrap_err();
    assert!(err.to_string().contains("row 1"), "got: {err:#}");
}

#[test]
fn columnar_ignores_extra_columns() -> Result<()> {
    let stage =
        MapStage::new(Columnar::new(visit_schema())).feed(byte_source("k\tv\textra\tmore\n"));
    assert_eq!(drain_to_string(stage)?, "k\tv\n");
    Ok(())
}

#[test]
fn columnar_setter_error_names_the_column() {
    let schema = Schema::new()
        .column(|r: &mut WordCount, cell: &str| {
            r.key = cell.to_string();
            Ok(())
        })
        .column(|r: &mut WordCount, cell: &str| {
            r.value = cell.parse().context("not an integer")?;
            Ok(())
        });
    let stage = MapStage::new(Columnar::new(schema)).feed(byte_source("k\tnot-a-number\n"));
    let mut out = Vec::new();
    let err = stage.drain(&mut out).unwrap_err();
    assert!(format!("{err:#}").contains("column 2"), "got: {err:#}");
}

#[cfg(feature = "format-binary")]
mod binary {
    use super::*;
    use rowflow::{binary, encode_frame};

    #[test]
    fn binary_frames_decode_through_a_map_stage() -> Result<()> {
        let mut input = Vec::new();
        input.extend(encode_frame(&WordCount {
            key: "a".to_string(),
            value: 1,
        })?);
        input.extend(encode_frame(&WordCount {
            key: "b".to_string(),
            value: 2,
        })?);
        let stage = MapStage::new(binary::<WordCount>()).feed(std::io::Cursor::new(input));
        assert_eq!(drain_to_string(stage)?, "a\t1\nb\t2\n");
        Ok(())
    }

    #[test]
    fn binary_truncated_frame_is_a_terminal_error() -> Result<()> {
        let mut input = encode_frame(&WordCount {
            key: "a".to_string(),
            value: 1,
        })?;
        input.extend_from_slice(&42u32.to_le_bytes()); // header promising 42 bytes
        input.extend_from_slice(b"short");
        let stage = MapStage::new(binary::<WordCount>()).feed(std::io::Cursor::new(input));
        let mut out = Vec::new();
        let err = stage.drain(&mut out).unwrap_err();
        assert!(format!("{err:#}").contains("truncated"), "got: {err:#}");
        assert_eq!(out, b"a\t1\n");
        Ok(())
    }
}
