#[cfg(test)]
mod tests {
    use super::super::events::*;
    use super::super::types::Side;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    #[test]
    fn test_event_creation_and_display() {
        let event = Event {
            timestamp: Utc::now(),
            round: 10,
            participant: "alice".to_string(),
            event_type: EventType::TradeExecuted {
                resource: "wheat".into(),
                side: TradeSide::Sell,
                units: dec!(4),
                price: dec!(2.5),
                counterparty: "bob".to_string(),
            },
        };

        let display = format!("{}", event);
        assert!(display.contains("[10] alice:"));
        assert!(display.contains("Sell 4 wheat at 2.5 with bob"));
    }

    #[test]
    fn test_event_logger() {
        let mut logger = EventLogger::new();

        logger.log(
            1,
            "alice".to_string(),
            EventType::OrderPlaced {
                resource: "wheat".into(),
                side: Side::Ask,
                units: dec!(10),
                price: dec!(2),
            },
        );

        logger.log(
            1,
            MARKET.to_string(),
            EventType::PriceRecorded {
                resource: "wheat".into(),
                price: dec!(2.5),
                volume: dec!(10),
                matches: 1,
            },
        );

        let events = logger.get_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].round, 1);
        assert_eq!(events[1].participant, MARKET);
        assert!(format!("{}", events[0]).contains("Placed ask for 10 wheat at 2"));

        logger.clear();
        assert!(logger.get_events().is_empty());
    }

    #[test]
    fn test_event_serialization() {
        let mut inventory = BTreeMap::new();
        inventory.insert("wheat".into(), dec!(3));
        let event = Event {
            timestamp: Utc::now(),
            round: 2,
            participant: "bob".to_string(),
            event_type: EventType::ParticipantSnapshot {
                cash: dec!(7.5),
                inventory,
                value: dec!(15),
            },
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"ParticipantSnapshot""#));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.round, 2);
        match back.event_type {
            EventType::ParticipantSnapshot { cash, inventory, .. } => {
                assert_eq!(cash, dec!(7.5));
                assert_eq!(inventory.len(), 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("sim-market-events-{}.json", std::process::id()));
        let mut logger = EventLogger::new();
        logger.log(
            3,
            "carol".to_string(),
            EventType::TradeExecuted {
                resource: "flour".into(),
                side: TradeSide::Buy,
                units: dec!(1),
                price: dec!(3),
                counterparty: "miller".to_string(),
            },
        );
        logger.save_to_file(&path).unwrap();

        let loaded = EventLogger::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.get_events().len(), 1);
        assert_eq!(loaded.get_events()[0].participant, "carol");
    }
}
