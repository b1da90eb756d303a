mod classifier_tests;
mod manifest_tests;
