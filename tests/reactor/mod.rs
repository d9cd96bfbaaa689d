mod fairness_test;
