use crate::domain::channels::ChannelOption;
use crate::domain::charges::ChargeBreakdown;
use crate::domain::customer::Segment;
use crate::domain::rates::{RateCorridor, RateQuote};
use crate::domain::service::{ServiceId, SummaryLine};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct QuoteRow<'a> {
    pair: &'a str,
    direction: String,
    mid_rate: Decimal,
    base_spread_bps: Decimal,
    effective_spread_bps: Decimal,
    offered_rate: Decimal,
    corridor_min: Decimal,
    corridor_max: Decimal,
    kes_equivalent: Decimal,
    segment_multiplier: Decimal,
    volume_multiplier: Decimal,
    engagement_multiplier: Decimal,
}

#[derive(Serialize)]
struct ChannelRow<'a> {
    id: &'a str,
    name: &'a str,
    cost: Decimal,
    sla: &'a str,
    realtime: bool,
    eligible: bool,
    recommended: bool,
    reason: Option<&'a str>,
}

#[derive(Serialize)]
struct ChargesRow {
    service: ServiceId,
    segment: Segment,
    service_fee: Decimal,
    excise_duty: Decimal,
    vat: Decimal,
    total_charges: Decimal,
}

/// Writes CLI reports as CSV to any `Write` sink.
///
/// Every report starts with a header row; values are written as plain
/// decimals so the output can be re-read without loss.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_summary(&mut self, lines: &[SummaryLine]) -> Result<()> {
        for line in lines {
            self.writer.serialize(line)?;
        }
        if lines.is_empty() {
            self.writer.write_record(["label", "value"])?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_quote(&mut self, quote: &RateQuote, corridor: &RateCorridor) -> Result<()> {
        self.writer.serialize(QuoteRow {
            pair: &quote.pair,
            direction: quote.direction.to_string(),
            mid_rate: quote.mid_rate,
            base_spread_bps: quote.base_spread_bps,
            effective_spread_bps: quote.effective_spread_bps,
            offered_rate: quote.offered_rate,
            corridor_min: corridor.min_rate,
            corridor_max: corridor.max_rate,
            kes_equivalent: quote.kes_equivalent,
            segment_multiplier: quote.segment_multiplier,
            volume_multiplier: quote.volume_multiplier,
            engagement_multiplier: quote.engagement_multiplier,
        })?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_channels(&mut self, options: &[ChannelOption]) -> Result<()> {
        for option in options {
            self.writer.serialize(ChannelRow {
                id: &option.id,
                name: &option.name,
                cost: option.cost,
                sla: &option.sla,
                realtime: option.realtime,
                eligible: option.is_eligible(),
                recommended: option.recommended,
                reason: option.eligibility.reason.as_deref(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_charges(
        &mut self,
        service: ServiceId,
        segment: Segment,
        charges: &ChargeBreakdown,
    ) -> Result<()> {
        self.writer.serialize(ChargesRow {
            service,
            segment,
            service_fee: charges.service_fee,
            excise_duty: charges.excise_duty,
            vat: charges.vat,
            total_charges: charges.total_charges,
        })?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::channels::{DestinationType, recommend_channels};
    use crate::domain::charges::compute_charges;
    use rust_decimal_macros::dec;

    fn render(f: impl FnOnce(&mut ReportWriter<&mut Vec<u8>>) -> Result<()>) -> String {
        let mut buffer = Vec::new();
        {
            let mut writer = ReportWriter::new(&mut buffer);
            f(&mut writer).unwrap();
        }
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_write_summary() {
        let output = render(|w| {
            w.write_summary(&[
                SummaryLine::new("Amount", "1500"),
                SummaryLine::new("Beneficiary name", "Otieno, Traders"),
            ])
        });
        assert_eq!(
            output,
            "label,value\nAmount,1500\nBeneficiary name,\"Otieno, Traders\"\n"
        );
    }

    #[test]
    fn test_write_charges() {
        let charges = compute_charges(ServiceId::BillPayment, Segment::Retail, None);
        let output = render(|w| w.write_charges(ServiceId::BillPayment, Segment::Retail, &charges));
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines[0],
            "service,segment,service_fee,excise_duty,vat,total_charges"
        );
        assert_eq!(lines[1], "bill-payment,retail,30,6.00,5.76,41.76");
    }

    #[test]
    fn test_write_channels_marks_recommendation() {
        let options = recommend_channels(dec!(20000), DestinationType::OtherBank);
        let output = render(|w| w.write_channels(&options));
        assert!(output.starts_with("id,name,cost,sla,realtime,eligible,recommended,reason\n"));
        assert!(output.contains("eft,EFT (Batch Clearing),0,1-2 business days,false,true,true,"));
        assert_eq!(output.lines().count(), options.len() + 1);
    }
}
