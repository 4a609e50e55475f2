//! Architecture Verification Suite
//!
//! Shared components must be usable from concurrent request handlers.

#[cfg(test)]
mod architecture_tests {
    use rose_checker::predictor::Classifier;
    use rose_checker::storage::{DiagnosisStore, UserStore};

    #[test]
    fn test_services_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<rose_checker::PredictionService>();
        assert_send_sync::<rose_checker::predictor::ForestModel>();
        assert_send_sync::<rose_checker::SymptomVocabulary>();
        assert_send_sync::<rose_checker::SqliteStore>();
        assert_send_sync::<rose_checker::auth::AuthService>();
        assert_send_sync::<rose_checker::auth::TokenIssuer>();
        assert_send_sync::<rose_checker::AppState>();
    }

    #[test]
    fn test_trait_objects_are_shareable() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}

        assert_send_sync::<dyn Classifier>();
        assert_send_sync::<dyn UserStore>();
        assert_send_sync::<dyn DiagnosisStore>();
    }

    #[test]
    fn test_sqlite_store_implements_both_stores() {
        fn assert_user_store<T: UserStore>() {}
        fn assert_diagnosis_store<T: DiagnosisStore>() {}

        assert_user_store::<rose_checker::SqliteStore>();
        assert_diagnosis_store::<rose_checker::SqliteStore>();
    }
}
