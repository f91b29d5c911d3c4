use fairturn_api::{ActorId, IdScheme, PoolState, TurnSnapshot};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_scheme_from_json() {
        let uuid: IdScheme = serde_json::from_str(r#"{ "kind": "uuid" }"#).unwrap();
        assert_eq!(uuid, IdScheme::Uuid);

        let sequential: IdScheme =
            serde_json::from_str(r#"{ "kind": "sequential", "prefix": "job" }"#).unwrap();
        assert_eq!(sequential.generate(7), ActorId::from("job-7"));

        assert!(serde_json::from_str::<IdScheme>(r#"{ "kind": "lexical" }"#).is_err());
    }

    #[test]
    fn test_actor_id_serializes_as_plain_string() {
        let id = ActorId::from("worker-3");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""worker-3""#);
    }

    #[test]
    fn test_pool_state_terminality() {
        assert!(PoolState::Drained.is_terminal());
        assert!(PoolState::Failed.is_terminal());
        assert!(!PoolState::Running.is_terminal());
        assert_eq!(PoolState::Stopping.to_string(), "stopping");
    }

    #[test]
    fn test_snapshot_statistics() {
        let snapshot = TurnSnapshot::new(vec![
            (ActorId::from("a"), 4),
            (ActorId::from("b"), 3),
            (ActorId::from("c"), 4),
        ]);

        assert_eq!(snapshot.total(), 11);
        assert_eq!(snapshot.min(), Some(3));
        assert_eq!(snapshot.max(), Some(4));
        assert_eq!(snapshot.spread(), 1);
        assert_eq!(snapshot.get(&ActorId::from("missing")), 0);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.is_object());
    }
}
