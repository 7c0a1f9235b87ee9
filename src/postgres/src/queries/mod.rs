mod forecasts;
mod observations;
