//! Deterministic callsign, operator and route generation.
//!
//! Operators and remote airports come from curated lists. Callsigns
//! are the operator's ICAO designator followed by a run-wide serial,
//! so they are unique within a run by construction.
//! All generation is deterministic (same RNG seed = same traffic).

use crate::rng::SubsystemRng;

/// Code used for this airport on every route.
pub const HOME_AIRPORT: &str = "HERE";

/// Deterministic generator over curated operator and airport lists.
pub struct CallsignGenerator;

impl CallsignGenerator {
    /// Pick an operator's ICAO designator.
    pub fn generate_operator(rng: &mut SubsystemRng) -> &'static str {
        let operators = Self::operators();
        let index = rng.next_u64_below(operators.len() as u64) as usize;
        operators[index]
    }

    /// Pick the far end of a route.
    pub fn generate_remote_airport(rng: &mut SubsystemRng) -> &'static str {
        let airports = Self::airports();
        let index = rng.next_u64_below(airports.len() as u64) as usize;
        airports[index]
    }

    /// `serial` must be unique within the run.
    pub fn callsign(operator: &str, serial: usize) -> String {
        format!("{operator}{serial:04}")
    }

    /// Curated list of airline ICAO designators
    fn operators() -> &'static [&'static str] {
        &[
            "AAL", "ACA", "AFR", "ANA", "ASA", "AUA", "AZA", "BAW", "CPA", "CSN",
            "DAL", "DLH", "EIN", "ETD", "EWG", "EZY", "FIN", "IBE", "JAL", "JBU",
            "KLM", "LOT", "NAX", "QFA", "QTR", "RYR", "SAS", "SIA", "SWA", "SWR",
            "TAP", "THY", "UAE", "UAL", "VIR", "VLG", "WJA", "WZZ",
        ]
    }

    /// Curated list of ICAO airport codes
    fn airports() -> &'static [&'static str] {
        &[
            "EDDF", "EDDM", "EGKK", "EGLL", "EHAM", "EIDW", "EKCH", "ENGM", "EPWA", "ESSA",
            "LEBL", "LEMD", "LFPG", "LIMC", "LIRF", "LOWW", "LPPT", "LSZH", "LTFM", "OMDB",
            "KATL", "KBOS", "KJFK", "KLAX", "KORD", "KSFO", "CYYZ", "RJTT", "VHHH", "WSSS",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngBank, SubsystemSlot};

    #[test]
    fn generation_is_deterministic() {
        let rng_bank1 = RngBank::new(12345);
        let mut rng1 = rng_bank1.for_subsystem_at_tick(SubsystemSlot::InboundTraffic, 1);
        let op1 = CallsignGenerator::generate_operator(&mut rng1);
        let apt1 = CallsignGenerator::generate_remote_airport(&mut rng1);

        let rng_bank2 = RngBank::new(12345);
        let mut rng2 = rng_bank2.for_subsystem_at_tick(SubsystemSlot::InboundTraffic, 1);
        let op2 = CallsignGenerator::generate_operator(&mut rng2);
        let apt2 = CallsignGenerator::generate_remote_airport(&mut rng2);

        assert_eq!(op1, op2, "Same seed should produce same operator");
        assert_eq!(apt1, apt2, "Same seed should produce same airport");
    }

    #[test]
    fn generates_well_formed_codes() {
        let rng_bank = RngBank::new(777);
        let mut rng = rng_bank.for_subsystem_at_tick(SubsystemSlot::OutboundTraffic, 4);

        for _ in 0..100 {
            let operator = CallsignGenerator::generate_operator(&mut rng);
            assert_eq!(operator.len(), 3, "Operator designator should be 3 letters: {operator}");

            let airport = CallsignGenerator::generate_remote_airport(&mut rng);
            assert_eq!(airport.len(), 4, "Airport code should be 4 letters: {airport}");
            assert_ne!(airport, HOME_AIRPORT);
        }
    }

    #[test]
    fn callsign_pads_serial() {
        assert_eq!(CallsignGenerator::callsign("BAW", 7), "BAW0007");
        assert_eq!(CallsignGenerator::callsign("DLH", 12345), "DLH12345");
    }
}
