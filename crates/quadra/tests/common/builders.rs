//! Builders for test documents.

#![allow(dead_code)]

use std::io::Write;

use quadra::RawDocument;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const ACME_IBAN: &str = "IT60 X054 2811 1010 0000 0123 456";

/// A bank transfer advice as sent by the bank after execution.
pub struct AdviceBuilder {
    date: String,
    amount: String,
    payer: String,
    iban: String,
    remark: String,
}

impl AdviceBuilder {
    pub fn new(amount: &str) -> Self {
        Self {
            date: "10/03/2024".to_string(),
            amount: amount.to_string(),
            payer: "ACME Trasporti S.r.l.".to_string(),
            iban: ACME_IBAN.to_string(),
            remark: "Fattura 45/2024".to_string(),
        }
    }

    pub fn date(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }

    pub fn remark(mut self, remark: &str) -> Self {
        self.remark = remark.to_string();
        self
    }

    pub fn payer(mut self, payer: &str) -> Self {
        self.payer = payer.to_string();
        self
    }

    pub fn text(&self) -> String {
        format!(
            "BONIFICO SEPA - Esito: eseguito\n\
             Data esecuzione: {}\n\
             Ordinante: {}\n\
             IBAN beneficiario: {}\n\
             Importo: EUR {}\n\
             Causale: {}\n",
            self.date, self.payer, self.iban, self.amount, self.remark
        )
    }

    pub fn build(&self, filename: &str) -> RawDocument {
        RawDocument::new(filename, self.text())
    }
}

/// A traffic fine notice.
pub fn fine_notice(filename: &str, number: &str, plate: &str, amount: &str) -> RawDocument {
    let text = format!(
        "Verbale di contravvenzione n. {}\n\
         Data accertamento: 05/03/2024\n\
         Veicolo targato {}\n\
         Importo: EUR {}\n\
         Causale: Verbale {} eccesso di velocita\n",
        number, plate, amount, number
    );
    RawDocument::new(filename, text)
}

/// A statement export with a header row; each row is `(date, amount, remark)`.
pub fn statement_csv(filename: &str, rows: &[(&str, &str, &str)]) -> RawDocument {
    let mut csv = String::from("Data contabile;Importo;Descrizione\n");
    for (date, amount, remark) in rows {
        csv.push_str(&format!("{};{};{}\n", date, amount, remark));
    }
    RawDocument::new(filename, csv)
}

/// A document no record can be built from.
pub fn unreadable_note(filename: &str) -> RawDocument {
    RawDocument::new(filename, "Promemoria: chiamare il fornitore domani.")
}

pub fn zip_archive(filename: &str, entries: &[(&str, &[u8])]) -> RawDocument {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(data).expect("write zip entry");
    }
    let bytes = writer.finish().expect("finish zip").into_inner();
    RawDocument::new(filename, bytes)
}
