use std::collections::HashSet;
use std::fs;
use std::io::Cursor;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use bio::io::fasta;

use mutperm::config::{TestConfig, TestKind};
use mutperm::error::Error;
use mutperm::gene::Gene;
use mutperm::io::{bed, maf, output};
use mutperm::permutation::{self, GeneResult};
use mutperm::pool::WorkerPool;
use mutperm::report;
use mutperm::seq;
use mutperm::seq::coding::GeneSequence;
use mutperm::seq::context::ContextOrder;

// ONC: six identical missense mutations on codon 30
// SUP: five nonsense mutations on a minus-strand gene
// LOF: frame shifts only, hence a TSG score of 1
const MUTATION_FILE: &[u8] = b"Gene\tChromosome\tStart_Position\tReference_Allele\tTumor_Allele\tVariant_Classification
ONC\t1\t100\tA\tC\tMissense_Mutation
ONC\t1\t100\tA\tC\tMissense_Mutation
ONC\t1\t100\tA\tC\tMissense_Mutation
ONC\t1\t100\tA\tC\tMissense_Mutation
ONC\t1\t100\tA\tC\tMissense_Mutation
ONC\t1\t100\tA\tC\tMissense_Mutation
SUP\t2\t173\tG\tT\tNonsense_Mutation
SUP\t2\t158\tG\tT\tNonsense_Mutation
SUP\t2\t143\tG\tT\tNonsense_Mutation
SUP\t2\t128\tG\tT\tNonsense_Mutation
SUP\t2\t113\tG\tT\tNonsense_Mutation
LOF\t1\t195\tG\t-\tFrame_Shift_Del
LOF\t1\t196\tG\t-\tFrame_Shift_Del
";

const BED_FILE: &[u8] = b"chr1\t10\t190\tONC\t0\t+\t10\t190\t0\t1\t180,\t0,
chr1\t190\t199\tLOF\t0\t+
chr2\t10\t190\tSUP\t0\t-
";

const FAI_FILE: &[u8] = b"chr1\t200\t6\t200\t201
chr2\t200\t213\t200\t201
";

fn cds(repeat: &[u8]) -> Vec<u8> {
    let mut s = b"ATG".to_vec();
    for _ in 0 .. 58 {
        s.extend_from_slice(repeat);
    }
    s.extend_from_slice(b"TAG");
    s
}

fn fasta_file() -> Vec<u8> {
    let flank = [b'G'; 10];

    let mut chr1 = flank.to_vec();
    chr1.extend(cds(b"AAA"));
    chr1.extend_from_slice(&flank);

    let mut sup = cds(b"TAC");
    seq::reverse_complement(&mut sup);
    let mut chr2 = flank.to_vec();
    chr2.extend(sup);
    chr2.extend_from_slice(&flank);

    let mut out = b">chr1\n".to_vec();
    out.extend(chr1);
    out.extend_from_slice(b"\n>chr2\n");
    out.extend(chr2);
    out.push(b'\n');
    out
}

fn run(config: &TestConfig) -> (Vec<GeneResult>, Vec<String>) {
    let records = maf::read_records(&mut maf::Reader::new(MUTATION_FILE)).expect("Error reading mutations");
    let table = maf::MutationTable::from_records(&records);
    let exclude = match config.kind {
        TestKind::Oncogene => maf::high_tsg_score_genes(&records, 0.10),
        TestKind::Tsg => HashSet::new(),
    };
    let mut excluded: Vec<String> = exclude.iter().cloned().collect();
    excluded.sort();

    let genes = bed::Reader::new(BED_FILE).genes().expect("Error reading BED");
    let chroms = bed::genes_by_chrom(genes, &exclude);

    let mut reader = fasta::IndexedReader::new(Cursor::new(fasta_file()), FAI_FILE).expect("Error reading index");
    let cancel = AtomicBool::new(false);
    let mut gs = GeneSequence::default();
    let mut results = Vec::new();
    for genes in chroms.values() {
        for gene in genes.iter() {
            let r = permutation::test_gene(&mut reader, gene, &table, &mut gs, config, &cancel).expect("Error testing gene");
            results.extend(r);
        }
    }
    (results, excluded)
}

#[test]
fn test_oncogene_pipeline() {
    let config = TestConfig { num_permutations: 1000, seed: Some(42), ..TestConfig::default() };
    let (results, excluded) = run(&config);
    // nonsense mutations count towards the TSG score as well
    assert_eq!(excluded, vec![String::from("LOF"), String::from("SUP")]);
    assert_eq!(results.len(), 1);

    let (position, deleterious) = report::split_results(results);
    assert!(deleterious.is_empty());

    let onc = &position[0];
    assert_eq!(onc.gene, "ONC");
    assert_eq!(onc.observed.num_recurrent, 6);
    assert_eq!(onc.observed.entropy, 0.0);
    let p = onc.p_values.expect("ONC should have been permuted");
    assert!(p.recurrent < 0.01);
    assert!(p.entropy < 0.01);

    let rows = report::oncogene_rows(position, &excluded);
    let genes: Vec<&str> = rows.iter().map(|r| r.gene.as_str()).collect();
    assert_eq!(genes, vec!["ONC", "LOF", "SUP"]);

    let mut writer = output::Writer::new(Vec::new());
    writer.write_oncogene(&rows).expect("Error writing results");
    let out = String::from_utf8(writer.into_inner().expect("Error flushing")).expect("invalid UTF-8");
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("ONC\t6\t0\t"));
    assert!(lines[1].ends_with("\t1"));
    assert!(lines[2].starts_with("LOF\t\t"));
    assert!(lines[3].ends_with("\t0"));
}

#[test]
fn test_tsg_pipeline() {
    let config = TestConfig {
        kind: TestKind::Tsg,
        num_permutations: 1000,
        context: ContextOrder::Zero,
        seed: Some(7),
        ..TestConfig::default()
    };
    let (results, excluded) = run(&config);
    assert!(excluded.is_empty());
    assert_eq!(results.len(), 3);

    let (_, deleterious) = report::split_results(results);
    let rows = report::tsg_rows(deleterious);
    assert_eq!(rows[0].gene, "SUP");
    assert_eq!(rows[0].num_deleterious, 5);
    let p = rows[0].deleterious.p_value.expect("SUP should have been permuted");
    assert!(p < 0.05, "p = {}", p);

    for r in rows[1 ..].iter() {
        assert_eq!(r.num_deleterious, 0);
        assert_eq!(r.deleterious.p_value, None);
        assert_eq!(r.deleterious.q_value, None);
    }
}

#[test]
fn test_seeded_runs_agree() {
    let config = TestConfig { num_permutations: 200, seed: Some(1), ..TestConfig::default() };
    let (a, _) = run(&config);
    let (b, _) = run(&config);
    assert_eq!(a, b);
}

#[test]
fn test_failing_gene_stops_pool() {
    let dir = std::env::temp_dir().join(format!("mutperm-pipeline-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("Error creating directory");
    let fasta_path = dir.join("genome.fa");
    fs::write(&fasta_path, fasta_file()).expect("Error writing FASTA");
    fs::write(dir.join("genome.fa.fai"), FAI_FILE).expect("Error writing index");

    // BAD extends past the end of chr2
    let bed_file = b"chr1\t10\t190\tONC\t0\t+\nchr2\t10\t190\tSUP\t0\t-\nchr2\t150\t243\tBAD\t0\t+\n";
    let genes = bed::Reader::new(&bed_file[..]).genes().expect("Error reading BED");
    let tasks: Vec<Vec<Gene>> = bed::genes_by_chrom(genes, &HashSet::new()).into_iter().map(|(_, genes)| genes).collect();

    let records = maf::read_records(&mut maf::Reader::new(MUTATION_FILE)).expect("Error reading mutations");
    let table = Arc::new(maf::MutationTable::from_records(&records));
    let config = TestConfig { num_permutations: 100, seed: Some(3), ..TestConfig::default() };

    let pool = WorkerPool::new(2);
    let path = fasta_path.clone();
    let mut handle = pool.submit(tasks, move |genes: Vec<Gene>, cancel: &AtomicBool| {
        permutation::test_chromosome(&path, &genes, &table, &config, cancel)
    });
    let res = handle.wait();
    let _ = fs::remove_dir_all(&dir);

    match res {
        Err(Error::Gene { gene, chrom, .. }) => {
            assert_eq!(gene, "BAD");
            assert_eq!(chrom, "chr2");
        },
        other => panic!("unexpected result: {:?}", other.map(|r| r.len())),
    }
}
