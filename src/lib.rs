// src/lib.rs

pub mod entities {
    pub mod prelude;

    pub mod cryptocurrency_metrics;
    pub mod cryptocurrency_prices;
}

pub mod services {
    pub mod coingecko;
    pub mod extractor;
}

pub mod pipeline {
    pub mod clean;
    pub mod kpis;
    pub mod load;
    pub mod quality;
    pub mod runner;
}

pub mod jobs {
    pub mod etl_sync;
}

pub mod models {
    pub mod market;
}

pub mod config;
