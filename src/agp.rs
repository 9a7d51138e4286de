//! AGP import/export (`spec.md` §6.2), grounded on
//! `original_source/hict/core/AGPProcessor.py`. Tab-separated lines; two
//! component types are handled (`N` spacers, skipped on import; `W`
//! sequence components), any other component type is a hard parse error.

use crate::error::{HictError, Result};
use crate::units::Direction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgpContigRecord {
    pub name: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgpScaffoldRecord {
    pub name: String,
    pub start_ctg: String,
    pub end_ctg: String,
    /// Length of the first `N` spacer row seen between two `W` rows of this
    /// run, or 0 for a singleton scaffold with no internal spacer.
    pub spacer_length: u64,
}

struct ScaffoldRun {
    object: String,
    start_ctg: String,
    end_ctg: String,
    spacer_length: Option<u64>,
}

/// Parses AGP text into ordered contig records and the scaffold runs they
/// fall into. A scaffold run is a maximal span of consecutive lines sharing
/// the same `object` field (`spec.md` §6.2); the last run is always closed
/// at EOF (resolving `spec.md` §9 Open Question (a)).
pub fn parse(text: &str) -> Result<(Vec<AgpContigRecord>, Vec<AgpScaffoldRecord>)> {
    let mut contigs = Vec::new();
    let mut scaffolds = Vec::new();
    let mut current: Option<ScaffoldRun> = None;

    for (line_no, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let toks: Vec<&str> = line.split('\t').collect();
        let fail = |reason: String| HictError::MalformedAssemblyRecord { line: line_no + 1, reason };
        if toks.len() < 9 {
            return Err(fail(format!("expected 9 tab-separated fields, got {}", toks.len())));
        }
        let object = toks[0].to_string();
        let component_type = toks[4];

        match component_type {
            "N" => {
                if let Some(run) = &mut current {
                    if run.object == object && run.spacer_length.is_none() {
                        let len: u64 = toks[5]
                            .parse()
                            .map_err(|_| fail(format!("non-numeric spacer length: {}", toks[5])))?;
                        run.spacer_length = Some(len);
                    }
                }
                continue;
            }
            "W" => {
                let component_name = toks[5].to_string();
                let direction = match toks[8] {
                    "+" => Direction::Forward,
                    "-" => Direction::Reversed,
                    other => return Err(fail(format!("unexpected symbol in direction column: {other}"))),
                };
                contigs.push(AgpContigRecord {
                    name: component_name.clone(),
                    direction,
                });
                match &mut current {
                    None => {
                        current = Some(ScaffoldRun {
                            object,
                            start_ctg: component_name.clone(),
                            end_ctg: component_name,
                            spacer_length: None,
                        })
                    }
                    Some(run) if run.object == object => {
                        run.end_ctg = component_name;
                    }
                    Some(run) => {
                        scaffolds.push(AgpScaffoldRecord {
                            name: run.object.clone(),
                            start_ctg: run.start_ctg.clone(),
                            end_ctg: run.end_ctg.clone(),
                            spacer_length: run.spacer_length.unwrap_or(0),
                        });
                        current = Some(ScaffoldRun {
                            object,
                            start_ctg: component_name.clone(),
                            end_ctg: component_name,
                            spacer_length: None,
                        });
                    }
                }
            }
            other => return Err(fail(format!("unexpected symbol in component_type column: {other}"))),
        }
    }

    if let Some(run) = current {
        scaffolds.push(AgpScaffoldRecord {
            name: run.object,
            start_ctg: run.start_ctg,
            end_ctg: run.end_ctg,
            spacer_length: run.spacer_length.unwrap_or(0),
        });
    }

    Ok((contigs, scaffolds))
}

/// One contig as the exporter needs to see it: name, bp length, and current
/// orientation.
pub struct AgpExportContig<'a> {
    pub name: &'a str,
    pub length_bp: u64,
    pub direction: Direction,
}

/// One scaffolded span over the ordered contigs, or `None` for an
/// unscaffolded gap (`spec.md` §3 "Scaffold-tree node").
pub struct AgpExportSpan<'a> {
    pub scaffold_name: Option<&'a str>,
    pub spacer_length: u64,
    pub length_bp: u64,
}

/// Exports AGP text. Each contig emits one `W` row; when two consecutive
/// contigs share a scaffold, a preceding `N` spacer row is emitted between
/// them. Unscaffolded contigs each become a singleton scaffold named
/// `unscaffolded_{contig_name}`. Component ids restart at 1 per scaffold.
pub fn export(contigs: &[AgpExportContig], spans: &[AgpExportSpan]) -> String {
    // Flatten spans into (name, spacer_length, start_bp, end_bp), skipping gaps.
    let mut scaffold_ranges: Vec<(String, u64, u64, u64)> = Vec::new();
    let mut pos = 0u64;
    for span in spans {
        if let Some(name) = span.scaffold_name {
            scaffold_ranges.push((name.to_string(), span.spacer_length, pos, pos + span.length_bp));
        }
        pos += span.length_bp;
    }

    let mut out = String::new();
    let mut prev_scaffold: Option<String> = None;
    let mut prev_end: u64 = 0;
    let mut component_id: u32 = 1;
    let mut position_bp: u64 = 0;
    let mut scaffold_idx = 0usize;

    for contig in contigs {
        while scaffold_idx < scaffold_ranges.len() && scaffold_ranges[scaffold_idx].3 <= position_bp {
            scaffold_idx += 1;
        }
        let (current_scaffold, spacer_length) = if scaffold_idx < scaffold_ranges.len()
            && scaffold_ranges[scaffold_idx].2 <= position_bp
            && position_bp < scaffold_ranges[scaffold_idx].3
        {
            let (name, spacer, ..) = &scaffold_ranges[scaffold_idx];
            (name.clone(), *spacer)
        } else {
            (format!("unscaffolded_{}", contig.name), 0)
        };

        if prev_scaffold.as_deref() == Some(current_scaffold.as_str()) {
            component_id += 1;
            out.push_str(&format!(
                "{obj}\t{start}\t{end}\t{cid}\tN\t{len}\tscaffold\tyes\tproximity_ligation\n",
                obj = current_scaffold,
                start = prev_end + 1,
                end = prev_end + spacer_length,
                cid = component_id,
                len = spacer_length,
            ));
            prev_end += spacer_length;
            component_id += 1;
        } else {
            component_id = 1;
        }

        let dir_str = if contig.direction == Direction::Forward { "+" } else { "-" };
        out.push_str(&format!(
            "{obj}\t{start}\t{end}\t{cid}\tW\t{name}\t1\t{len}\t{dir}\n",
            obj = current_scaffold,
            start = prev_end + 1,
            end = prev_end + contig.length_bp,
            cid = component_id,
            name = contig.name,
            len = contig.length_bp,
            dir = dir_str,
        ));
        prev_end += contig.length_bp;
        position_bp += contig.length_bp;
        prev_scaffold = Some(current_scaffold);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_w_lines_and_closes_trailing_scaffold_run_at_eof() {
        let text = "scaf1\t1\t100\t1\tW\tctgA\t1\t100\t+\nscaf1\t101\t200\t2\tW\tctgB\t1\t100\t-\nscaf2\t1\t50\t1\tW\tctgC\t1\t50\t+\n";
        let (contigs, scaffolds) = parse(text).unwrap();
        assert_eq!(contigs.len(), 3);
        assert_eq!(contigs[0].direction, Direction::Forward);
        assert_eq!(contigs[1].direction, Direction::Reversed);
        assert_eq!(scaffolds.len(), 2);
        assert_eq!(
            scaffolds[0],
            AgpScaffoldRecord { name: "scaf1".into(), start_ctg: "ctgA".into(), end_ctg: "ctgB".into(), spacer_length: 0 }
        );
        assert_eq!(
            scaffolds[1],
            AgpScaffoldRecord { name: "scaf2".into(), start_ctg: "ctgC".into(), end_ctg: "ctgC".into(), spacer_length: 0 }
        );
    }

    #[test]
    fn n_lines_are_skipped_on_import_but_their_length_is_kept_as_the_scaffold_spacer() {
        let text = "scaf1\t1\t100\t1\tW\tctgA\t1\t100\t+\nscaf1\t101\t600\t2\tN\t500\tscaffold\tyes\tproximity_ligation\nscaf1\t601\t700\t3\tW\tctgB\t1\t100\t+\n";
        let (contigs, scaffolds) = parse(text).unwrap();
        assert_eq!(contigs.len(), 2);
        assert_eq!(scaffolds.len(), 1);
        assert_eq!(scaffolds[0].spacer_length, 500);
    }

    #[test]
    fn unexpected_component_type_is_a_hard_error() {
        let text = "scaf1\t1\t100\t1\tX\tctgA\t1\t100\t+\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, HictError::MalformedAssemblyRecord { .. }));
    }

    #[test]
    fn export_emits_spacer_between_same_scaffold_contigs_and_singletons_otherwise() {
        let contigs = vec![
            AgpExportContig { name: "ctgA", length_bp: 100, direction: Direction::Forward },
            AgpExportContig { name: "ctgB", length_bp: 50, direction: Direction::Reversed },
            AgpExportContig { name: "ctgC", length_bp: 30, direction: Direction::Forward },
        ];
        let spans = vec![
            AgpExportSpan { scaffold_name: Some("scaf1"), spacer_length: 10, length_bp: 150 },
            AgpExportSpan { scaffold_name: None, length_bp: 30, spacer_length: 0 },
        ];
        let text = export(&contigs, &spans);
        let lines: Vec<&str> = text.lines().collect();
        // ctgA, spacer, ctgB (all scaf1), then ctgC as its own unscaffolded scaffold.
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("scaf1\t1\t100\t1\tW\tctgA"));
        assert!(lines[1].contains("\tN\t10\t"));
        assert!(lines[2].starts_with("scaf1") && lines[2].contains("\tW\tctgB"));
        assert!(lines[3].starts_with("unscaffolded_ctgC") && lines[3].contains("\tW\tctgC"));
    }

    #[test]
    fn round_trip_export_then_import_preserves_contig_order_and_direction() {
        let contigs = vec![
            AgpExportContig { name: "ctgA", length_bp: 100, direction: Direction::Forward },
            AgpExportContig { name: "ctgB", length_bp: 50, direction: Direction::Reversed },
        ];
        let spans = vec![AgpExportSpan { scaffold_name: Some("scaf1"), spacer_length: 10, length_bp: 150 }];
        let text = export(&contigs, &spans);
        let (parsed_contigs, parsed_scaffolds) = parse(&text).unwrap();
        assert_eq!(parsed_contigs.len(), 2);
        assert_eq!(parsed_contigs[0].name, "ctgA");
        assert_eq!(parsed_contigs[0].direction, Direction::Forward);
        assert_eq!(parsed_contigs[1].direction, Direction::Reversed);
        assert_eq!(parsed_scaffolds.len(), 1);
        assert_eq!(parsed_scaffolds[0].name, "scaf1");

        let text2 = export(&contigs, &spans);
        assert_eq!(text, text2, "export must be deterministic for a byte-identical round trip");
    }
}
