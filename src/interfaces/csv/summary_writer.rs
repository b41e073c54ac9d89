use crate::error::Result;
use std::io::Write;

/// Writes the replay result as `entity,id,state` rows: wallet balances and
/// final order/package statuses.
pub struct SummaryWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SummaryWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_header(&mut self) -> Result<()> {
        self.writer.write_record(["entity", "id", "state"])?;
        Ok(())
    }

    pub fn write_row(&mut self, entity: &str, id: u64, state: &str) -> Result<()> {
        self.writer
            .write_record([entity, &id.to_string(), state])?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_format() {
        let mut buf = Vec::new();
        {
            let mut writer = SummaryWriter::new(&mut buf);
            writer.write_header().unwrap();
            writer.write_row("wallet", 1, "50").unwrap();
            writer.write_row("order", 10, "ORDERING").unwrap();
            writer.flush().unwrap();
        }
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out, "entity,id,state\nwallet,1,50\norder,10,ORDERING\n");
    }
}
