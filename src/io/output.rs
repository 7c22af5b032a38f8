use std::fs;
use std::io;
use std::path::Path;

use crate::error::Result;
use crate::report::{OncogeneResult, TsgResult};

const ONCOGENE_HEADER: [&str; 14] = [
    "gene",
    "num recurrent",
    "position entropy",
    "kde position entropy",
    "kde bandwidth",
    "recurrent p-value",
    "recurrent BH q-value",
    "entropy p-value",
    "entropy BH q-value",
    "kde entropy p-value",
    "kde entropy BH q-value",
    "kde bandwidth p-value",
    "kde bandwidth BH q-value",
    "Performed Recurrency Test",
];

const TSG_HEADER: [&str; 4] = [
    "gene",
    "num deleterious",
    "deleterious p-value",
    "deleterious BH q-value",
];

/// Tab-separated writer of result tables.
/// Undefined values are written as empty fields.
pub struct Writer<W: io::Write> {
    inner: csv::Writer<W>,
}

impl Writer<fs::File> {
    /// Write to a given file path.
    pub fn to_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        fs::File::create(path).map(Writer::new)
    }
}

impl<W: io::Write> Writer<W> {
    /// Write to a given writer.
    pub fn new(writer: W) -> Self {
        Writer {
            inner: csv::WriterBuilder::new()
                .delimiter(b'\t')
                .has_headers(false)
                .from_writer(writer),
        }
    }

    pub fn write_oncogene(&mut self, rows: &[OncogeneResult]) -> Result<()> {
        self.inner.write_record(&ONCOGENE_HEADER)?;
        for r in rows.iter() {
            let (num_recurrent, entropy, kde_entropy, bandwidth) = match r.stats {
                Some(s) => (s.num_recurrent.to_string(), fmt_f64(Some(s.entropy)), fmt_f64(Some(s.kde_entropy)), fmt_f64(Some(s.bandwidth))),
                None => (String::new(), String::new(), String::new(), String::new()),
            };
            self.inner.write_record(&[
                r.gene.clone(),
                num_recurrent,
                entropy,
                kde_entropy,
                bandwidth,
                fmt_f64(r.recurrent.p_value),
                fmt_f64(r.recurrent.q_value),
                fmt_f64(r.entropy.p_value),
                fmt_f64(r.entropy.q_value),
                fmt_f64(r.kde_entropy.p_value),
                fmt_f64(r.kde_entropy.q_value),
                fmt_f64(r.bandwidth.p_value),
                fmt_f64(r.bandwidth.q_value),
                String::from(if r.performed { "1" } else { "0" }),
            ])?;
        }
        self.inner.flush()?;
        Ok(())
    }

    pub fn write_tsg(&mut self, rows: &[TsgResult]) -> Result<()> {
        self.inner.write_record(&TSG_HEADER)?;
        for r in rows.iter() {
            self.inner.write_record(&[
                r.gene.clone(),
                r.num_deleterious.to_string(),
                fmt_f64(r.deleterious.p_value),
                fmt_f64(r.deleterious.q_value),
            ])?;
        }
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Option<W> {
        self.inner.into_inner().ok()
    }
}

fn fmt_f64(x: Option<f64>) -> String {
    x.map(|x| x.to_string()).unwrap_or_default()
}
