mod test_monte_carlo;
mod test_project;
mod test_tariff;
